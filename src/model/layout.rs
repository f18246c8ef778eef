use glam::Vec3;

/// Floor-grid placement for the `index`-th item: rows run along +z,
/// columns along +x, cubes rest with their centre at y = 0.5.
pub fn grid_position(index: usize, columns: usize, spacing: f32) -> Vec3 {
    let columns = columns.max(1);
    let col = (index % columns) as f32;
    let row = (index / columns) as f32;
    Vec3::new(col * spacing, 0.5, row * spacing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_after_column_count() {
        assert_eq!(grid_position(0, 3, 2.0), Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(grid_position(2, 3, 2.0), Vec3::new(4.0, 0.5, 0.0));
        assert_eq!(grid_position(3, 3, 2.0), Vec3::new(0.0, 0.5, 2.0));
    }

    #[test]
    fn zero_columns_degrades_to_single_column() {
        assert_eq!(grid_position(2, 0, 1.0), Vec3::new(0.0, 0.5, 2.0));
    }
}
