mod tests {
    use embassy_time::{Duration, Instant};
    use myrtio_light_controller::math8::{
        blend8, elapsed_ms, elapsed_since, map_range, scale8, scale8_video,
    };

    #[test]
    fn test_scale8() {
        assert_eq!(scale8(255, 128), 128);
        assert_eq!(scale8(0, 128), 0);
        assert_eq!(scale8(128, 128), 64);
        assert_eq!(scale8(128, 255), 128);
        assert_eq!(scale8(128, 0), 0);
    }

    #[test]
    fn test_scale8_video_keeps_dim_pixels_lit() {
        assert_eq!(scale8(1, 10), 0);
        assert_eq!(scale8_video(1, 10), 1);
        assert_eq!(scale8_video(1, 0), 0);
        assert_eq!(scale8_video(0, 200), 0);
        assert_eq!(scale8_video(255, 128), 128);
    }

    #[test]
    fn test_blend8() {
        assert_eq!(blend8(255, 128, 128), 191);
        assert_eq!(blend8(0, 128, 255), 128);
        assert_eq!(blend8(255, 0, 128), 127);
        assert_eq!(blend8(255, 128, 0), 255);
    }

    #[test]
    fn test_map_range_is_clamped() {
        assert_eq!(map_range(25, 0, 50, 1, 5), 3);
        assert_eq!(map_range(50, 0, 50, 1, 5), 5);
        assert_eq!(map_range(100, 0, 50, 1, 5), 5);
        assert_eq!(map_range(-100, 0, 50, 1, 5), 1);
        assert_eq!(map_range(3, 2, 2, 7, 9), 7);
    }

    #[test]
    fn test_elapsed_since_handles_tick_wraparound() {
        let since = Instant::from_ticks(u64::MAX - 4);
        let now = Instant::from_ticks(5);
        assert_eq!(elapsed_since(now, since), Duration::from_ticks(10));
    }

    #[test]
    fn test_elapsed_ms() {
        assert_eq!(
            elapsed_ms(Instant::from_millis(1500), Instant::from_millis(1000)),
            500
        );
    }
}
