//! Browser collaborators and the `WebEngine` facade exported to JS.
//!
//! The engine lives in `Rc<RefCell<…>>`. Every DOM listener and timer
//! closure holds only a `Weak` to it and drops its work (with a warning) if
//! the engine is gone or already borrowed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use glam::Vec3;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, EventTarget, HtmlCanvasElement, HtmlElement, HtmlInputElement, KeyboardEvent,
    MouseEvent, Window,
};

use super::{CaptureControls, Collaborators, DeadlineScheduler, DetailPanel, SceneRegistry, TableView, TimerHandle, VisualKind};
use crate::config::EngineConfig;
use crate::controller::{FocusTarget, InputEvent, InputProcessor, InteractionEngine, MouseButton};
use crate::error::EngineError;
use crate::model::{ItemId, ProbeId, Record, Viewpoint, VisualHandle};

type SharedEngine = Rc<RefCell<InteractionEngine>>;
type WeakEngine = Weak<RefCell<InteractionEngine>>;

/// Handle used when the JS scene could not create a visual; every later
/// operation on it reports "gone".
const NO_VISUAL: VisualHandle = VisualHandle(u64::MAX);

fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

fn with_engine(engine: &WeakEngine, f: impl FnOnce(&mut InteractionEngine)) {
    let Some(engine) = engine.upgrade() else {
        return;
    };
    match engine.try_borrow_mut() {
        Ok(mut engine) => f(&mut engine),
        Err(_) => tracing::warn!("engine busy, event dropped"),
    };
}

/// Delegates to a JS scene object exposing `registerItem`, `addVisual`,
/// `removeVisual`, `hasVisual`, `setVisualPosition` and `setHighlighted`.
pub struct JsSceneRegistry {
    scene: JsValue,
}

impl JsSceneRegistry {
    pub fn new(scene: JsValue) -> Self {
        Self { scene }
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Option<JsValue> {
        let func = Reflect::get(&self.scene, &JsValue::from_str(method))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok());
        let Some(func) = func else {
            tracing::warn!(method, "scene object lacks method");
            return None;
        };
        let args: Array = args.iter().collect();
        match func.apply(&self.scene, &args) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(method, ?err, "scene call threw");
                None
            }
        }
    }

    fn call_bool(&self, method: &str, args: &[JsValue]) -> bool {
        self.call(method, args).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    fn call_handle(&self, method: &str, args: &[JsValue]) -> VisualHandle {
        match self.call(method, args).and_then(|v| v.as_f64()) {
            Some(n) if n >= 0.0 => VisualHandle(n as u64),
            _ => NO_VISUAL,
        }
    }
}

fn xyz(p: Vec3) -> [JsValue; 3] {
    [p.x.into(), p.y.into(), p.z.into()]
}

fn handle_arg(handle: VisualHandle) -> JsValue {
    JsValue::from_f64(handle.0 as f64)
}

impl SceneRegistry for JsSceneRegistry {
    fn register_item(&mut self, id: &ItemId, position: Vec3) -> VisualHandle {
        let [x, y, z] = xyz(position);
        self.call_handle("registerItem", &[JsValue::from_str(id.as_str()), x, y, z])
    }

    fn add_visual(&mut self, kind: VisualKind, position: Vec3) -> VisualHandle {
        let kind = match kind {
            VisualKind::Item => "item",
            VisualKind::Probe => "probe",
        };
        let [x, y, z] = xyz(position);
        self.call_handle("addVisual", &[JsValue::from_str(kind), x, y, z])
    }

    fn remove_visual(&mut self, handle: VisualHandle) -> bool {
        handle != NO_VISUAL && self.call_bool("removeVisual", &[handle_arg(handle)])
    }

    fn contains_visual(&self, handle: VisualHandle) -> bool {
        handle != NO_VISUAL && self.call_bool("hasVisual", &[handle_arg(handle)])
    }

    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec3) -> bool {
        let [x, y, z] = xyz(position);
        handle != NO_VISUAL && self.call_bool("setVisualPosition", &[handle_arg(handle), x, y, z])
    }

    fn set_highlighted(&mut self, handle: VisualHandle, highlighted: bool) -> bool {
        handle != NO_VISUAL && self.call_bool("setHighlighted", &[handle_arg(handle), highlighted.into()])
    }
}

/// First-person controls bound to canvas pointer lock.
pub struct PointerLockControls {
    document: Document,
    canvas: HtmlCanvasElement,
    viewpoint: Viewpoint,
}

impl PointerLockControls {
    pub fn new(document: Document, canvas: HtmlCanvasElement, viewpoint: Viewpoint) -> Self {
        Self { document, canvas, viewpoint }
    }
}

impl CaptureControls for PointerLockControls {
    fn request_lock(&mut self) -> Result<(), EngineError> {
        // Browsers report refusal asynchronously via `pointerlockerror`;
        // a missing API surfaces here.
        let request = Reflect::get(&self.canvas, &JsValue::from_str("requestPointerLock"))
            .map_err(|_| EngineError::CaptureDenied("pointer lock API unavailable".into()))?;
        if !request.is_function() {
            return Err(EngineError::CaptureDenied("pointer lock API unavailable".into()));
        }
        self.canvas.request_pointer_lock();
        Ok(())
    }

    fn release_lock(&mut self) {
        self.document.exit_pointer_lock();
    }

    fn is_locked(&self) -> bool {
        let canvas: &Element = self.canvas.as_ref();
        self.document.pointer_lock_element().as_ref() == Some(canvas)
    }

    fn move_right(&mut self, amount: f32) {
        self.viewpoint.move_right(amount);
    }

    fn move_forward(&mut self, amount: f32) {
        self.viewpoint.move_forward(amount);
    }

    fn look(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.viewpoint.rotate(yaw_delta, pitch_delta);
    }

    fn look_at(&mut self, target: Vec3) {
        self.viewpoint.set_look_at(target);
    }

    fn world_direction(&self) -> Vec3 {
        self.viewpoint.forward()
    }

    fn position(&self) -> Vec3 {
        self.viewpoint.eye
    }

    fn set_position(&mut self, position: Vec3) {
        self.viewpoint.eye = position;
    }
}

/// Checkbox rows found by element id `{row_prefix}{item id}`.
pub struct DomTable {
    document: Document,
    row_prefix: String,
}

impl DomTable {
    pub fn new(document: Document, row_prefix: impl Into<String>) -> Self {
        Self { document, row_prefix: row_prefix.into() }
    }
}

impl TableView for DomTable {
    fn set_checked(&mut self, id: &ItemId, checked: bool) -> bool {
        let element_id = format!("{}{}", self.row_prefix, id);
        match self
            .document
            .get_element_by_id(&element_id)
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            Some(checkbox) => {
                checkbox.set_checked(checked);
                true
            }
            None => false,
        }
    }
}

/// Renders a record as a `<dl>` of field/value pairs.
pub struct DomDetailPanel {
    document: Document,
    container: Element,
}

impl DomDetailPanel {
    pub fn new(document: Document, container: Element) -> Self {
        Self { document, container }
    }

    fn append_pair(&self, list: &Element, name: &str, value: &str) -> Result<(), JsValue> {
        let dt = self.document.create_element("dt")?;
        dt.set_text_content(Some(name));
        let dd = self.document.create_element("dd")?;
        dd.set_text_content(Some(value));
        list.append_child(&dt)?;
        list.append_child(&dd)?;
        Ok(())
    }

    fn render(&self, record: &Record) -> Result<(), JsValue> {
        let list = self.document.create_element("dl")?;
        for (name, value) in &record.fields {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            self.append_pair(&list, name, &text)?;
        }
        self.container.set_inner_html("");
        self.container.append_child(&list)?;
        Ok(())
    }
}

impl DetailPanel for DomDetailPanel {
    fn show(&mut self, record: &Record) {
        if let Err(err) = self.render(record) {
            tracing::warn!(id = %record.id, ?err, "detail panel render failed");
        }
    }

    fn clear(&mut self) {
        self.container.set_inner_html("");
    }
}

type TimerClosure = Closure<dyn FnMut()>;

/// Probe deadlines on `window.setTimeout`.
pub struct WindowScheduler {
    window: Window,
    engine: WeakEngine,
    next: u64,
    timers: Rc<RefCell<HashMap<TimerHandle, (i32, TimerClosure)>>>,
    /// Closures of timers that already fired; they cannot be dropped from
    /// inside their own invocation, so they are released on the next schedule.
    spent: Rc<RefCell<Vec<TimerClosure>>>,
}

impl WindowScheduler {
    pub fn new(window: Window, engine: WeakEngine) -> Self {
        Self {
            window,
            engine,
            next: 0,
            timers: Rc::new(RefCell::new(HashMap::new())),
            spent: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn cancel_all(&mut self) {
        for (_, (timeout_id, _closure)) in self.timers.borrow_mut().drain() {
            self.window.clear_timeout_with_handle(timeout_id);
        }
        self.spent.borrow_mut().clear();
    }
}

impl DeadlineScheduler for WindowScheduler {
    fn schedule(&mut self, probe: ProbeId, after: Duration) -> TimerHandle {
        self.spent.borrow_mut().clear();
        let handle = TimerHandle(self.next);
        self.next += 1;

        let engine = self.engine.clone();
        let timers = Rc::downgrade(&self.timers);
        let spent = Rc::downgrade(&self.spent);
        let closure = Closure::wrap(Box::new(move || {
            if let (Some(timers), Some(spent)) = (timers.upgrade(), spent.upgrade()) {
                if let Some((_, own)) = timers.borrow_mut().remove(&handle) {
                    spent.borrow_mut().push(own);
                }
            }
            with_engine(&engine, |engine| {
                engine.on_probe_deadline(probe);
            });
        }) as Box<dyn FnMut()>);

        match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            after.as_millis().min(i32::MAX as u128) as i32,
        ) {
            Ok(timeout_id) => {
                self.timers.borrow_mut().insert(handle, (timeout_id, closure));
            }
            Err(err) => tracing::warn!(%probe, ?err, "setTimeout failed, probe relies on range"),
        }
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let removed = self.timers.borrow_mut().remove(&handle);
        if let Some((timeout_id, _closure)) = removed {
            self.window.clear_timeout_with_handle(timeout_id);
        }
    }
}

impl Drop for WindowScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// DOM listeners kept alive until `dispose`, then detached.
#[derive(Default)]
struct ListenerRegistry {
    listeners: Vec<Listener>,
}

impl ListenerRegistry {
    fn listen(
        &mut self,
        target: &EventTarget,
        kind: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        self.listeners.push(Listener { target: target.clone(), kind, closure });
        Ok(())
    }

    fn detach_all(&mut self) -> usize {
        let count = self.listeners.len();
        for listener in self.listeners.drain(..) {
            if let Err(err) = listener
                .target
                .remove_event_listener_with_callback(listener.kind, listener.closure.as_ref().unchecked_ref())
            {
                tracing::warn!(kind = listener.kind, ?err, "failed to detach listener");
            }
        }
        count
    }
}

fn is_text_entry(element: &Element) -> bool {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        return !matches!(input.type_().as_str(), "checkbox" | "radio" | "button" | "submit" | "range");
    }
    let editable = element
        .dyn_ref::<HtmlElement>()
        .is_some_and(|el| el.is_content_editable());
    editable || matches!(element.tag_name().as_str(), "TEXTAREA" | "SELECT")
}

fn focus_target(document: &Document, canvas: &Element) -> FocusTarget {
    let locked = document.pointer_lock_element().as_ref() == Some(canvas);
    let typing = document.active_element().is_some_and(|el| is_text_entry(&el));
    FocusTarget::resolve(locked, typing)
}

/// The interaction engine wired to a canvas, a checkbox table, a detail
/// element and a JS scene object.
#[wasm_bindgen]
pub struct WebEngine {
    engine: SharedEngine,
    listeners: ListenerRegistry,
}

#[wasm_bindgen]
impl WebEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        canvas_id: &str,
        scene: JsValue,
        table_id: &str,
        row_prefix: &str,
        detail_id: &str,
        config_json: &str,
    ) -> Result<WebEngine, JsValue> {
        let config = EngineConfig::from_json(config_json)?;
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or(js_error(format!("no element #{canvas_id}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error(format!("#{canvas_id} is not a canvas")))?;
        let table = document
            .get_element_by_id(table_id)
            .ok_or(js_error(format!("no element #{table_id}")))?;
        let detail = document
            .get_element_by_id(detail_id)
            .ok_or(js_error(format!("no element #{detail_id}")))?;

        let controls = PointerLockControls::new(document.clone(), canvas.clone(), Viewpoint::default());
        let engine: SharedEngine = Rc::new_cyclic(|weak: &WeakEngine| {
            let ports = Collaborators {
                scene: Box::new(JsSceneRegistry::new(scene)),
                controls: Box::new(controls),
                table: Box::new(DomTable::new(document.clone(), row_prefix)),
                detail: Box::new(DomDetailPanel::new(document.clone(), detail)),
                scheduler: Box::new(WindowScheduler::new(window.clone(), weak.clone())),
            };
            RefCell::new(InteractionEngine::new(config, ports))
        });

        let mut web = WebEngine { engine, listeners: ListenerRegistry::default() };
        web.setup_listeners(&window, &document, &canvas, &table)?;
        tracing::info!(canvas_id, table_id, detail_id, "web engine ready");
        Ok(web)
    }

    /// Replace the dataset with a JSON array of records. Returns the item count.
    pub fn load_records(&self, json: &str) -> Result<usize, JsValue> {
        let mut engine = self.engine.try_borrow_mut().map_err(|_| js_error("engine busy"))?;
        let records = Record::list_from_json(json, &engine.config().id_field)?;
        engine.load_dataset(records);
        Ok(engine.items().len())
    }

    pub fn remove_rows(&self, ids: Vec<String>) -> usize {
        let ids: Vec<ItemId> = ids.into_iter().map(ItemId::from).collect();
        let mut removed = 0;
        with_engine(&Rc::downgrade(&self.engine), |engine| removed = engine.remove_items(&ids));
        removed
    }

    pub fn toggle_selection(&self, id: &str, selected: bool) {
        with_engine(&Rc::downgrade(&self.engine), |engine| {
            engine.toggle_selection(&ItemId::new(id), selected);
        });
    }

    pub fn clear_selection(&self) {
        with_engine(&Rc::downgrade(&self.engine), |engine| {
            engine.clear_selection();
        });
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.engine
            .try_borrow()
            .map(|engine| engine.selection().selected().map(|id| id.to_string()).collect())
            .unwrap_or_default()
    }

    /// Per-frame tick. Returns the number of probe hits this frame.
    pub fn update(&self, delta: f32) -> usize {
        let mut hits = 0;
        with_engine(&Rc::downgrade(&self.engine), |engine| {
            hits = engine.update(delta).hits.len();
        });
        hits
    }

    /// `[x, y, z, dx, dy, dz]`: eye position and unit view direction.
    pub fn viewpoint(&self) -> Vec<f32> {
        self.engine
            .try_borrow()
            .map(|engine| {
                let p = engine.viewpoint_position();
                let d = engine.viewpoint_direction();
                vec![p.x, p.y, p.z, d.x, d.y, d.z]
            })
            .unwrap_or_default()
    }

    /// `callback(itemId)` runs on every probe hit, before the selection flips.
    /// It must not call back into this engine synchronously.
    pub fn on_collision_hit(&self, callback: Function) {
        with_engine(&Rc::downgrade(&self.engine), |engine| {
            engine.set_collision_hook(move |id| {
                if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(id.as_str())) {
                    tracing::warn!(%id, ?err, "collision callback threw");
                }
            });
        });
    }

    /// Detach every listener, cancel pending deadlines and evict probes.
    pub fn dispose(&mut self) {
        let detached = self.listeners.detach_all();
        with_engine(&Rc::downgrade(&self.engine), |engine| engine.dispose());
        tracing::info!(detached, "web engine disposed");
    }
}

impl WebEngine {
    fn setup_listeners(
        &mut self,
        window: &Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
        table: &Element,
    ) -> Result<(), JsValue> {
        let processor = InputProcessor::new(self.engine.borrow().config().bindings.clone());
        let weak = Rc::downgrade(&self.engine);

        // Keyboard down
        {
            let weak = weak.clone();
            let document_for_focus = document.clone();
            let canvas_el: Element = canvas.clone().into();
            let processor = processor.clone();
            self.listeners.listen(document, "keydown", move |e: Event| {
                let Some(e) = e.dyn_ref::<KeyboardEvent>() else { return };
                let key = e.key();
                let focus = focus_target(&document_for_focus, &canvas_el);
                if focus == FocusTarget::Scene && processor.is_navigation_key(&key) {
                    e.prevent_default();
                }
                with_engine(&weak, |engine| engine.handle_event(InputEvent::KeyDown { key, focus }));
            })?;
        }

        // Keyboard up
        {
            let weak = weak.clone();
            let document_for_focus = document.clone();
            let canvas_el: Element = canvas.clone().into();
            self.listeners.listen(document, "keyup", move |e: Event| {
                let Some(e) = e.dyn_ref::<KeyboardEvent>() else { return };
                let focus = focus_target(&document_for_focus, &canvas_el);
                with_engine(&weak, |engine| engine.handle_event(InputEvent::KeyUp { key: e.key(), focus }));
            })?;
        }

        // Focus loss - clear all keys
        {
            let weak = weak.clone();
            self.listeners.listen(window, "blur", move |_e: Event| {
                with_engine(&weak, |engine| engine.handle_event(InputEvent::FocusLost));
            })?;
        }

        // Visibility change - clear all keys
        {
            let weak = weak.clone();
            let doc = document.clone();
            self.listeners.listen(document, "visibilitychange", move |_e: Event| {
                let visible = !doc.hidden();
                with_engine(&weak, |engine| engine.handle_event(InputEvent::VisibilityChanged { visible }));
            })?;
        }

        // Pointer lock change
        {
            let weak = weak.clone();
            let doc = document.clone();
            let canvas_el: Element = canvas.clone().into();
            self.listeners.listen(document, "pointerlockchange", move |_e: Event| {
                let active = doc.pointer_lock_element().as_ref() == Some(&canvas_el);
                with_engine(&weak, |engine| engine.handle_event(InputEvent::CaptureChanged { active }));
            })?;
        }

        // Pointer lock refused
        {
            let weak = weak.clone();
            self.listeners.listen(document, "pointerlockerror", move |_e: Event| {
                tracing::warn!("pointer lock refused by the browser");
                with_engine(&weak, |engine| engine.handle_event(InputEvent::CaptureChanged { active: false }));
            })?;
        }

        // Canvas click: capture, or fire once captured
        {
            let weak = weak.clone();
            let doc = document.clone();
            self.listeners.listen(canvas, "mousedown", move |e: Event| {
                let Some(e) = e.dyn_ref::<MouseEvent>() else { return };
                let button = MouseButton::from_web_button(e.button());
                // preventDefault keeps focus where it was; hand it back to the scene.
                e.prevent_default();
                if let Some(field) = doc.active_element().and_then(|el| el.dyn_into::<HtmlElement>().ok()) {
                    let _ = field.blur();
                }
                with_engine(&weak, |engine| engine.handle_event(InputEvent::PointerDown { button }));
            })?;
        }

        // Mouse move
        {
            let weak = weak.clone();
            self.listeners.listen(document, "mousemove", move |e: Event| {
                let Some(e) = e.dyn_ref::<MouseEvent>() else { return };
                let (dx, dy) = (e.movement_x() as f32, e.movement_y() as f32);
                with_engine(&weak, |engine| engine.handle_event(InputEvent::PointerMove { dx, dy }));
            })?;
        }

        // Table checkbox changes, delegated to the table element
        {
            let weak = weak.clone();
            self.listeners.listen(table, "change", move |e: Event| {
                let Some(checkbox) = e.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
                    return;
                };
                let Some(id) = checkbox.get_attribute("data-item-id") else { return };
                let checked = checkbox.checked();
                with_engine(&weak, |engine| {
                    engine.toggle_selection(&ItemId::new(id), checked);
                });
            })?;
        }

        // Context menu prevention
        self.listeners.listen(canvas, "contextmenu", move |e: Event| {
            e.prevent_default();
        })?;

        Ok(())
    }
}
