/// Colors offered when creating a habit, in display order.
pub const HABIT_COLORS: [&str; 8] = [
    "#7B896F", // sage green
    "#A67C52", // warm brown
    "#6366F1", // indigo
    "#D97706", // orange
    "#DC2626", // red
    "#0891B2", // ocean blue
    "#059669", // forest green
    "#7C2D12", // terracotta
];

/// Upper bound on habits per user, checked by front ends before creating.
pub const MAX_HABITS: usize = 50;

/// Palette color for the `index`-th habit, wrapping around.
pub fn palette_color(index: usize) -> &'static str {
    HABIT_COLORS[index % HABIT_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), "#7B896F");
        assert_eq!(palette_color(8), "#7B896F");
        assert_eq!(palette_color(10), "#6366F1");
    }
}
