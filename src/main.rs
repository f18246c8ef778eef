use std::env;
use std::fs;
use std::time::Duration;

use cubeviz::controller::{FocusTarget, InputEvent, InteractionEngine, MouseButton};
use cubeviz::view::headless::{HeadlessControls, HeadlessDetailPanel, HeadlessScene, HeadlessTable, ManualScheduler};
use cubeviz::view::{CaptureControls, Collaborators};
use cubeviz::{logging, EngineConfig, EngineError, Record};

const FRAME: f32 = 1.0 / 60.0;
const MAX_FRAMES: usize = 1_000;

const SAMPLE_DATASET: &str = r#"[
    { "id": "north", "label": "North gate", "visitors": 1204 },
    { "id": "east",  "label": "East hall",  "visitors": 310 },
    { "id": "south", "label": "South yard", "visitors": 87 }
]"#;

fn read_file(path: &str) -> Result<String, EngineError> {
    fs::read_to_string(path).map_err(|e| EngineError::Dataset(format!("{path}: {e}")))
}

/// Headless replay: load a dataset, walk forward, fire a probe at the second
/// item and report what got selected.
///
/// Usage: `cubeviz [dataset.json] [config.json]`
fn main() -> Result<(), EngineError> {
    logging::init();

    let mut args = env::args().skip(1);
    let dataset = match args.next() {
        Some(path) => read_file(&path)?,
        None => SAMPLE_DATASET.to_string(),
    };
    let config = match args.next() {
        Some(path) => EngineConfig::from_json(&read_file(&path)?)?,
        None => EngineConfig::default(),
    };
    let records = Record::list_from_json(&dataset, &config.id_field)?;

    let scene = HeadlessScene::new();
    let controls = HeadlessControls::default();
    let table = HeadlessTable::new();
    let detail = HeadlessDetailPanel::new();
    let scheduler = ManualScheduler::new();
    table.populate(&records);

    let ports = Collaborators {
        scene: Box::new(scene.clone()),
        controls: Box::new(controls.clone()),
        table: Box::new(table.clone()),
        detail: Box::new(detail.clone()),
        scheduler: Box::new(scheduler.clone()),
    };
    let mut engine = InteractionEngine::new(config, ports);
    engine.load_dataset(records);

    // First click captures the pointer.
    engine.handle_event(InputEvent::PointerDown { button: MouseButton::Left });

    engine.handle_event(InputEvent::KeyDown { key: "w".into(), focus: FocusTarget::Scene });
    for _ in 0..10 {
        step(&mut engine, &scheduler);
    }
    engine.handle_event(InputEvent::KeyUp { key: "w".into(), focus: FocusTarget::Scene });
    tracing::info!(position = ?engine.viewpoint_position(), "walked forward");

    let target = engine
        .items()
        .iter()
        .nth(1)
        .or_else(|| engine.items().iter().next())
        .map(|item| (item.id.clone(), item.position));
    if let Some((id, position)) = target {
        let mut aim = controls.clone();
        aim.look_at(position);
        tracing::info!(%id, "aiming");
        engine.handle_event(InputEvent::PointerDown { button: MouseButton::Left });
    }

    let mut frames = 0;
    while engine.active_probes() > 0 && frames < MAX_FRAMES {
        let report = step(&mut engine, &scheduler);
        for hit in &report.hits {
            tracing::info!(probe = %hit.probe, item = %hit.item, frame = frames, "hit");
        }
        frames += 1;
    }

    let selected: Vec<String> = engine.selection().selected().map(|id| id.to_string()).collect();
    tracing::info!(
        ?selected,
        detail = ?detail.shown().map(|r| r.id),
        checked = ?table.checked_ids(),
        highlighted = ?scene.highlighted_items(),
        "selection after replay"
    );
    for event in engine.drain_events() {
        tracing::debug!(?event, "journal");
    }

    let stats = engine.projectile_stats();
    engine.dispose();
    tracing::info!(retired = stats.retired(), pending_timers = scheduler.pending(), "replay finished");
    Ok(())
}

fn step(engine: &mut InteractionEngine, scheduler: &ManualScheduler) -> cubeviz::TickReport {
    let report = engine.update(FRAME);
    for probe in scheduler.advance(Duration::from_secs_f32(FRAME)) {
        engine.on_probe_deadline(probe);
    }
    report
}
