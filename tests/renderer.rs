mod tests {
    use embassy_time::{Duration, Instant};
    use myrtio_light_controller::math8::scale8_video;
    use myrtio_light_controller::{
        ColorMode, CommandProcessor, EffectId, EffectRegistry, Feedback, FeedbackRun, FrameClock,
        MemoryStorage, Pixel, ProcessorConfig, Renderer, RendererConfig, Scene,
    };

    const STRIP: usize = 8;

    fn ms(value: u64) -> Instant {
        Instant::from_millis(value)
    }

    fn scene(effect: EffectId, brightness: u8) -> Scene {
        let processor = CommandProcessor::new(
            MemoryStorage::default(),
            EffectRegistry::default(),
            ProcessorConfig::default(),
        );
        let mut scene = processor.scene();
        let entry = EffectRegistry::default()
            .iter()
            .find(|entry| entry.id == effect)
            .map(|entry| entry.values())
            .unwrap();
        scene.effect = effect;
        scene.params = entry;
        scene.is_on = true;
        scene.brightness = brightness;
        scene
    }

    fn renderer(scene: Scene) -> Renderer<STRIP> {
        Renderer::new(
            RendererConfig {
                strip_len: STRIP as u16,
                ..RendererConfig::default()
            },
            scene,
        )
    }

    /// Tick until the eased brightness reaches the target
    fn settle(renderer: &mut Renderer<STRIP>, now: Instant) {
        for _ in 0..=u8::MAX {
            if renderer.brightness() == renderer.scene().brightness && !renderer.is_dirty() {
                return;
            }
            renderer.tick(now);
        }
    }

    #[test]
    fn test_brightness_eases_one_step_per_frame() {
        let mut renderer = renderer(scene(EffectId::Static, 10));
        assert_eq!(renderer.brightness(), 0);
        for expected in 1..=10 {
            assert!(renderer.tick(ms(0)).is_some());
            assert_eq!(renderer.brightness(), expected);
        }
    }

    #[test]
    fn test_scene_updates_do_not_advance_the_fade() {
        let mut renderer = renderer(scene(EffectId::Static, 10));
        for t in 0..5 {
            renderer.apply_scene(scene(EffectId::Static, 10));
            assert!(renderer.render(ms(t)).is_some());
        }
        assert_eq!(renderer.brightness(), 0);

        assert!(renderer.tick(ms(33)).is_some());
        assert_eq!(renderer.brightness(), 1);
    }

    #[test]
    fn test_static_effect_stops_once_settled() {
        let mut renderer = renderer(scene(EffectId::Static, 10));
        let mut frames = 0;
        for tick in 0..20 {
            if renderer.tick(ms(tick * 33)).is_some() {
                frames += 1;
            }
        }
        assert_eq!(frames, 10);
        assert!(renderer.tick(ms(1000)).is_none());

        renderer.apply_scene(scene(EffectId::Static, 10));
        assert!(renderer.render(ms(1033)).is_some());
    }

    #[test]
    fn test_dynamic_effect_keeps_rendering() {
        let mut renderer = renderer(scene(EffectId::Rainbow, 10));
        settle(&mut renderer, ms(0));
        for tick in 1..5 {
            assert!(renderer.tick(ms(tick * 33)).is_some());
        }
    }

    #[test]
    fn test_turn_off_fades_to_black_then_idles() {
        let mut renderer = renderer(scene(EffectId::Rainbow, 5));
        settle(&mut renderer, ms(0));

        let mut off = scene(EffectId::Rainbow, 5);
        off.is_on = false;
        renderer.apply_scene(off);
        for _ in 0..5 {
            assert!(renderer.tick(ms(100)).is_some());
        }
        assert_eq!(renderer.brightness(), 0);
        assert!(renderer.frame().active().iter().all(|pixel| *pixel == Pixel::BLACK));
        assert!(renderer.tick(ms(133)).is_none());
    }

    #[test]
    fn test_min_brightness_lifts_low_levels() {
        let mut scene = scene(EffectId::Static, 1);
        scene.min_brightness = 50;
        let mut renderer = renderer(scene);
        let frame = renderer.tick(ms(0)).unwrap();
        assert_eq!(frame.color_mode, ColorMode::Hsv);
        assert_eq!(frame.count, STRIP as u16);
        for pixel in frame.active() {
            assert_eq!(pixel.0[2], scale8_video(255, 50));
            assert_eq!(pixel.0[2], 50);
        }
    }

    #[test]
    fn test_masked_window() {
        let mut scene = scene(EffectId::Static, 1);
        scene.masked = true;
        scene.start_offset = 2;
        scene.end_offset = 3;
        let mut renderer = renderer(scene.clone());
        let frame = renderer.tick(ms(0)).unwrap();
        for (index, pixel) in frame.active().iter().enumerate() {
            let inside = (2..5).contains(&index);
            assert_eq!(*pixel != Pixel::BLACK, inside, "pixel {}", index);
        }

        // Unmasked, the offsets are ignored
        scene.masked = false;
        renderer.apply_scene(scene);
        let frame = renderer.tick(ms(33)).unwrap();
        assert!(frame.active().iter().all(|pixel| *pixel != Pixel::BLACK));
    }

    #[test]
    fn test_overlapping_offsets_leave_strip_dark() {
        let mut scene = scene(EffectId::Static, 1);
        scene.masked = true;
        scene.start_offset = 6;
        scene.end_offset = 6;
        let mut renderer = renderer(scene);
        let frame = renderer.tick(ms(0)).unwrap();
        assert!(frame.active().iter().all(|pixel| *pixel == Pixel::BLACK));
    }

    #[test]
    fn test_feedback_overrides_effect() {
        let start = ms(1000);
        let mut scene = scene(EffectId::Static, 10);
        let mut renderer = renderer(scene.clone());
        settle(&mut renderer, start);

        scene.feedback = Some(FeedbackRun::new(Feedback::Confirm, start));
        renderer.apply_scene(scene);

        let lit = Pixel([0, scale8_video(255, 96), 0]);
        let frame = renderer.tick(start + Duration::from_millis(10)).unwrap();
        assert_eq!(frame.color_mode, ColorMode::Rgb);
        assert!(frame.active().iter().all(|pixel| *pixel == lit));

        let frame = renderer.tick(start + Duration::from_millis(250)).unwrap();
        assert!(frame.active().iter().all(|pixel| *pixel == Pixel::BLACK));

        let frame = renderer.tick(start + Duration::from_millis(450)).unwrap();
        assert_eq!(frame.color_mode, ColorMode::Hsv);
        assert!(frame.active().iter().all(|pixel| *pixel != Pixel::BLACK));
        assert!(renderer.tick(start + Duration::from_millis(483)).is_none());
    }

    #[test]
    fn test_effect_switch_changes_color_mode() {
        let mut renderer = renderer(scene(EffectId::Static, 10));
        settle(&mut renderer, ms(0));
        renderer.apply_scene(scene(EffectId::Candle, 10));
        let frame = renderer.tick(ms(33)).unwrap();
        assert_eq!(frame.color_mode, ColorMode::Rgb);
    }

    #[test]
    fn test_frame_clock_skips_backlog() {
        let period = Duration::from_millis(33);
        let mut clock = FrameClock::starting_at(ms(0), period);
        assert_eq!(clock.next_deadline(), ms(33));

        // Slightly late frames keep the cadence
        clock.advance(ms(40));
        assert_eq!(clock.next_deadline(), ms(66));

        // Far behind: restart from now instead of bursting
        clock.advance(ms(200));
        assert_eq!(clock.next_deadline(), ms(233));
    }
}
