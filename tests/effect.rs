mod tests {
    use embassy_time::Instant;
    use myrtio_light_controller::effect::{
        Effect, EffectEntry, ParamSpec, Parameter, RainbowEffect, RenderContext, TwinkleEffect,
    };
    use myrtio_light_controller::{ColorMode, EffectId, EffectRegistry, Pixel};

    fn ctx(params: &[i16], now_ms: u64) -> RenderContext<'_> {
        RenderContext {
            params,
            brightness: 255,
            now: Instant::from_millis(now_ms),
        }
    }

    #[test]
    fn test_effect_id_slots() {
        for id in EffectId::ALL {
            assert_eq!(id.to_slot().id(), id);
            assert_eq!(id.to_slot().descriptor(), id.descriptor());
        }
        assert_eq!(EffectId::Twinkle.descriptor().name, "twinkle");
    }

    #[test]
    fn test_descriptors() {
        assert!(!EffectId::Static.descriptor().dynamic);
        assert!(EffectId::Rainbow.descriptor().dynamic);
        assert_eq!(EffectId::Candle.descriptor().color_mode, ColorMode::Rgb);
        assert_eq!(EffectId::Twinkle.descriptor().color_mode, ColorMode::Hsv);
    }

    #[test]
    fn test_parameter_clamps() {
        let mut param = Parameter::new(ParamSpec::new("level", 0, 10, 2, 4));
        assert_eq!(param.value(), 4);

        let adjusted = param.adjust(2);
        assert_eq!((adjusted.value, adjusted.limit_hit), (8, false));
        let adjusted = param.adjust(2);
        assert_eq!((adjusted.value, adjusted.limit_hit), (10, true));
        let adjusted = param.adjust(-10);
        assert_eq!((adjusted.value, adjusted.limit_hit), (0, true));

        assert!(param.set(11).limit_hit);
        assert_eq!(param.value(), 10);
        assert!(!param.set(10).limit_hit);

        param.reset();
        assert_eq!(param.value(), 4);
    }

    #[test]
    fn test_parameter_wraps() {
        let mut hue = Parameter::new(ParamSpec::new("hue", 0, 255, 8, 250).wrapping());
        let adjusted = hue.adjust(1);
        assert_eq!(adjusted.value, 2);
        assert!(adjusted.limit_hit);
        assert_eq!(hue.adjust(-1).value, 250);
    }

    #[test]
    fn test_out_of_range_default_is_clamped() {
        let param = Parameter::new(ParamSpec::new("odd", 5, 10, 1, 0));
        assert_eq!(param.value(), 5);
    }

    #[test]
    fn test_registry_order_and_reset() {
        let mut registry = EffectRegistry::from_ids(&[EffectId::Twinkle, EffectId::Static]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).map(|entry| entry.id), Some(EffectId::Twinkle));
        assert!(registry.get(2).is_none());

        registry.get_mut(0).unwrap().params[0].adjust(3);
        assert_eq!(registry.get(0).unwrap().values()[0], 11);
        registry.reset();
        assert_eq!(*registry.get(0).unwrap(), EffectEntry::new(EffectId::Twinkle));

        assert_eq!(EffectRegistry::default().len(), EffectId::ALL.len());
        assert!(EffectRegistry::from_ids(&[]).is_empty());
    }

    #[test]
    fn test_rainbow_moves_over_time() {
        let mut effect = RainbowEffect;
        let mut first = [Pixel::BLACK; 4];
        let mut later = [Pixel::BLACK; 4];
        effect.render(&ctx(&[5, 4], 0), &mut first);
        effect.render(&ctx(&[5, 4], 1000), &mut later);
        assert_ne!(first, later);
        // Density spreads the hue along the strip
        assert_eq!(first[1].0[0].wrapping_sub(first[0].0[0]), 4);
    }

    #[test]
    fn test_twinkle_rebuilds_on_length_change() {
        let mut effect = TwinkleEffect::new();
        let mut long = [Pixel::BLACK; 16];
        effect.render(&ctx(&[50, 1, 160], 0), &mut long);
        assert_eq!(effect.pixel_count(), 16);
        assert!(long.iter().any(|pixel| pixel.0[2] == 255));

        let mut short = [Pixel::BLACK; 6];
        effect.render(&ctx(&[50, 1, 160], 33), &mut short);
        assert_eq!(effect.pixel_count(), 6);
        // Fresh state: only the newly spawned stars are lit
        assert!(short.iter().all(|pixel| pixel.0[2] == 0 || pixel.0[2] == 255));
    }

    #[test]
    fn test_twinkle_stars_fade() {
        let mut effect = TwinkleEffect::new();
        let mut leds = [Pixel::BLACK; 256];
        effect.render(&ctx(&[1, 32, 0], 0), &mut leds);
        let lit: Vec<usize> = (0..leds.len()).filter(|i| leds[*i].0[2] == 255).collect();
        assert_eq!(lit.len(), 1);

        effect.render(&ctx(&[1, 32, 0], 33), &mut leds);
        assert!(leds[lit[0]].0[2] == 255 - 32 || leds[lit[0]].0[2] == 255);
    }
}
