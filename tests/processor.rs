mod tests {
    use embassy_time::Instant;
    use myrtio_light_controller::calibration::{MIN_BRIGHTNESS, START_OFFSET};
    use myrtio_light_controller::effect::ParamValues;
    use myrtio_light_controller::{
        CommandProcessor, EffectId, EffectRegistry, Feedback, LedCommand, LedCommandKind,
        MemoryStorage, ProcessorConfig, StaticState, SystemCalibration, VolatileState,
    };

    use LedCommandKind as K;

    const TWINKLE: i16 = 3;

    fn ms(value: u64) -> Instant {
        Instant::from_millis(value)
    }

    fn cmd(kind: LedCommandKind) -> LedCommand {
        LedCommand::new(kind, ms(0))
    }

    fn processor() -> CommandProcessor<MemoryStorage> {
        CommandProcessor::new(
            MemoryStorage::default(),
            EffectRegistry::default(),
            ProcessorConfig::default(),
        )
    }

    fn synced_processor() -> CommandProcessor<MemoryStorage> {
        CommandProcessor::new(
            MemoryStorage::default(),
            EffectRegistry::default(),
            ProcessorConfig {
                sync_enabled: true,
                ..ProcessorConfig::default()
            },
        )
    }

    fn active_values(processor: &CommandProcessor<MemoryStorage>) -> ParamValues {
        processor
            .registry()
            .get(processor.effect_index())
            .map(|entry| entry.values())
            .unwrap_or_default()
    }

    #[test]
    fn test_defaults_without_stored_state() {
        let processor = processor();
        assert!(!processor.is_on());
        assert_eq!(processor.brightness(), 128);
        assert_eq!(processor.effect_index(), 0);
        assert!(!processor.has_snapshot());
        let scene = processor.scene();
        assert_eq!(scene.effect, EffectId::Static);
        assert!(!scene.masked);
        assert_eq!(scene.feedback, None);
    }

    #[test]
    fn test_loads_stored_state() {
        let mut registry = EffectRegistry::default();
        registry.get_mut(3).unwrap().params[0].set(20);
        let mut calibration = SystemCalibration::default();
        calibration.set(MIN_BRIGHTNESS, 10);

        let storage = MemoryStorage {
            volatile: Some(VolatileState {
                is_on: true,
                brightness: 40,
                effect_index: 7,
            }),
            static_state: Some(StaticState::capture(&calibration, &registry)),
            ..MemoryStorage::default()
        };
        let processor =
            CommandProcessor::new(storage, EffectRegistry::default(), ProcessorConfig::default());

        assert!(processor.is_on());
        assert_eq!(processor.brightness(), 40);
        // Index past the table end is clamped to the last effect
        assert_eq!(processor.effect_index(), 3);
        assert_eq!(active_values(&processor)[0], 20);
        assert_eq!(processor.scene().min_brightness, 10);
    }

    #[test]
    fn test_stored_values_are_clamped() {
        let mut state = StaticState::capture(&SystemCalibration::default(), &EffectRegistry::default());
        state.min_brightness = 250;
        state.effect_params[3][0] = 999;
        let storage = MemoryStorage {
            static_state: Some(state),
            ..MemoryStorage::default()
        };
        let processor =
            CommandProcessor::new(storage, EffectRegistry::default(), ProcessorConfig::default());
        assert_eq!(processor.calibration().min_brightness(), 128);
        assert_eq!(processor.registry().get(3).unwrap().values()[0], 50);
    }

    #[test]
    fn test_power_is_saved_immediately() {
        let mut processor = processor();
        let outcome = processor.apply(&cmd(K::TurnOn), ms(0));
        assert!(outcome.dirty);
        assert!(processor.is_on());
        assert_eq!(processor.storage().volatile.map(|state| state.is_on), Some(true));

        let outcome = processor.apply(&cmd(K::TurnOn), ms(10));
        assert!(!outcome.dirty);
        assert_eq!(processor.storage().volatile_saves, 1);
    }

    #[test]
    fn test_brightness_clamps() {
        let mut processor = processor();
        processor.apply(&cmd(K::SetBrightness).with_value(300), ms(0));
        assert_eq!(processor.brightness(), 255);
        processor.apply(&cmd(K::SetBrightness).with_value(-5), ms(0));
        assert_eq!(processor.brightness(), 0);

        processor.apply(&cmd(K::SetBrightness).with_value(250), ms(0));
        let outcome = processor.apply(&cmd(K::AdjustBrightness).with_value(1), ms(0));
        assert_eq!(processor.brightness(), 255);
        assert_eq!(outcome.follow_up.map(|command| command.kind), Some(K::FeedbackLimit));

        let outcome = processor.apply(&cmd(K::AdjustBrightness).with_value(-100), ms(0));
        assert_eq!(processor.brightness(), 1);
        assert!(outcome.follow_up.is_some());

        let outcome = processor.apply(&cmd(K::AdjustBrightness).with_value(2), ms(0));
        assert_eq!(processor.brightness(), 17);
        assert_eq!(outcome.follow_up, None);
    }

    #[test]
    fn test_brightness_save_is_debounced() {
        let mut processor = processor();
        processor.apply(&cmd(K::AdjustBrightness).with_value(1), ms(0));
        assert_eq!(processor.next_save_deadline(), Some(ms(3000)));
        assert_eq!(processor.storage().volatile_saves, 0);

        processor.apply(&cmd(K::AdjustBrightness).with_value(1), ms(1000));
        assert!(!processor.flush_pending_save(ms(3500)));
        assert!(processor.flush_pending_save(ms(4000)));
        assert_eq!(processor.storage().volatile.map(|state| state.brightness), Some(144));
        assert_eq!(processor.next_save_deadline(), None);
        assert!(!processor.flush_pending_save(ms(9000)));
    }

    #[test]
    fn test_set_effect_clamps_and_step_wraps() {
        let mut processor = processor();
        processor.apply(&cmd(K::SetEffect).with_value(10), ms(0));
        assert_eq!(processor.effect_index(), 3);
        processor.apply(&cmd(K::StepEffect).with_value(1), ms(0));
        assert_eq!(processor.effect_index(), 0);
        processor.apply(&cmd(K::StepEffect).with_value(-1), ms(0));
        assert_eq!(processor.effect_index(), 3);
        processor.apply(&cmd(K::SetEffect).with_value(-1), ms(0));
        assert_eq!(processor.effect_index(), 0);
    }

    #[test]
    fn test_limit_feedback_suppresses_adjustments() {
        let t = 1000;
        let mut processor = processor();
        processor.apply(&cmd(K::SetEffect).with_value(TWINKLE), ms(t));
        processor.apply(&cmd(K::EnterEffectSetup), ms(t));
        processor.apply(&cmd(K::SetEffectParam).with_param(0).with_value(49), ms(t));

        let outcome = processor.apply(&cmd(K::AdjustEffectParam).with_value(3), ms(t));
        assert_eq!(active_values(&processor)[0], 50);
        let follow_up = outcome.follow_up.unwrap();
        assert_eq!(follow_up.kind, K::FeedbackLimit);

        let outcome = processor.apply(&follow_up, ms(t));
        assert!(outcome.dirty);
        assert_eq!(
            processor.scene().feedback.map(|run| run.feedback),
            Some(Feedback::Limit)
        );

        let outcome = processor.apply(&cmd(K::AdjustEffectParam).with_value(-1), ms(t + 100));
        assert!(outcome.suppressed);
        assert!(!outcome.dirty);
        assert_eq!(active_values(&processor)[0], 50);

        let outcome = processor.apply(&cmd(K::AdjustEffectParam).with_value(-1), ms(t + 500));
        assert!(!outcome.suppressed);
        assert_eq!(active_values(&processor)[0], 49);
    }

    #[test]
    fn test_transactions_are_never_suppressed() {
        let mut processor = processor();
        processor.apply(&cmd(K::EnterEffectSetup), ms(0));
        processor.apply(&cmd(K::FeedbackConfirm), ms(0));

        let outcome = processor.apply(&cmd(K::AdjustBrightness).with_value(1), ms(10));
        assert!(outcome.suppressed);
        let outcome = processor.apply(&cmd(K::SaveConfig), ms(10));
        assert!(!outcome.suppressed);
        assert!(!processor.has_snapshot());
        let outcome = processor.apply(&cmd(K::TurnOn), ms(10));
        assert!(!outcome.suppressed);
        assert!(processor.is_on());
    }

    #[test]
    fn test_cancel_restores_effect_params() {
        let mut processor = processor();
        processor.apply(&cmd(K::SetEffect).with_value(TWINKLE), ms(0));
        let before = processor.scene();

        processor.apply(&cmd(K::EnterEffectSetup), ms(0));
        assert!(processor.has_snapshot());
        processor.apply(&cmd(K::AdjustEffectParam).with_value(5), ms(0));
        processor.apply(&cmd(K::NextParam), ms(0));
        processor.apply(&cmd(K::AdjustEffectParam).with_value(-3), ms(0));
        processor.apply(&cmd(K::NextParam), ms(0));
        processor.apply(&cmd(K::AdjustEffectParam).with_value(2), ms(0));
        assert_ne!(processor.scene(), before);

        let outcome = processor.apply(&cmd(K::CancelConfig), ms(0));
        assert!(outcome.dirty);
        assert_eq!(processor.scene(), before);
        assert!(!processor.has_snapshot());
        assert_eq!(processor.storage().static_saves, 0);
    }

    #[test]
    fn test_next_param_cycles_active_effect() {
        let mut processor = processor();
        processor.apply(&cmd(K::EnterEffectSetup), ms(0));
        assert_eq!(processor.selected_param(), 0);
        processor.apply(&cmd(K::NextParam), ms(0));
        assert_eq!(processor.selected_param(), 1);
        processor.apply(&cmd(K::NextParam), ms(0));
        assert_eq!(processor.selected_param(), 0);
    }

    #[test]
    fn test_effect_select_preview_and_cancel() {
        let mut processor = processor();
        processor.apply(&cmd(K::EnterEffectSelect), ms(0));
        processor.apply(&cmd(K::StepEffect).with_value(1), ms(0));
        assert_eq!(processor.effect_index(), 1);
        assert_eq!(processor.next_save_deadline(), None);

        processor.apply(&cmd(K::CancelConfig), ms(0));
        assert_eq!(processor.effect_index(), 0);

        processor.apply(&cmd(K::EnterEffectSelect), ms(0));
        processor.apply(&cmd(K::StepEffect).with_value(-1), ms(0));
        processor.apply(&cmd(K::SaveConfig), ms(0));
        assert_eq!(processor.effect_index(), 3);
        assert_eq!(processor.storage().volatile.map(|state| state.effect_index), Some(3));
        assert!(!processor.has_snapshot());
    }

    #[test]
    fn test_save_is_idempotent() {
        let mut processor = processor();
        processor.apply(&cmd(K::EnterEffectSetup), ms(0));
        processor.apply(&cmd(K::AdjustEffectParam).with_value(2), ms(0));
        processor.apply(&cmd(K::SaveConfig), ms(0));
        let first = processor.storage().clone();
        let scene = processor.scene();

        processor.apply(&cmd(K::SaveConfig), ms(0));
        assert_eq!(processor.storage().volatile, first.volatile);
        assert_eq!(processor.storage().static_state, first.static_state);
        assert_eq!(processor.scene(), scene);

        let stored = processor.storage().static_state.clone().unwrap();
        assert_eq!(stored.effect_params[0][0], 24 + 2 * 4);
    }

    #[test]
    fn test_system_setup_masks_and_cancels() {
        let mut processor = processor();
        let outcome = processor.apply(&cmd(K::EnterSystemSetup), ms(0));
        assert!(outcome.dirty);
        assert!(processor.scene().masked);

        processor.apply(&cmd(K::NextParam), ms(0));
        processor.apply(&cmd(K::AdjustCalibration).with_value(3), ms(0));
        assert_eq!(processor.scene().start_offset, 3);
        assert_eq!(processor.calibration().get(START_OFFSET).map(|p| p.value()), Some(3));

        // Three calibration values, so the cycle wraps after the third
        processor.apply(&cmd(K::NextParam), ms(0));
        processor.apply(&cmd(K::NextParam), ms(0));
        assert_eq!(processor.selected_param(), 0);

        processor.apply(&cmd(K::CancelConfig), ms(0));
        let scene = processor.scene();
        assert_eq!(scene.start_offset, 0);
        assert!(!scene.masked);
    }

    #[test]
    fn test_switch_mask_survives_system_setup() {
        let mut processor = processor();
        processor.apply(&cmd(K::SetMasked).with_value(1), ms(0));
        processor.apply(&cmd(K::EnterSystemSetup), ms(0));
        processor.apply(&cmd(K::SaveConfig), ms(0));
        assert!(processor.scene().masked);
    }

    #[test]
    fn test_calibration_limit() {
        let mut processor = processor();
        processor.apply(&cmd(K::EnterSystemSetup), ms(0));
        let outcome = processor.apply(&cmd(K::AdjustCalibration).with_value(-5), ms(0));
        assert_eq!(processor.calibration().min_brightness(), 0);
        assert_eq!(outcome.follow_up.map(|command| command.kind), Some(K::FeedbackLimit));
    }

    #[test]
    fn test_factory_reset() {
        let mut processor = processor();
        processor.apply(&cmd(K::SetEffect).with_value(2), ms(0));
        processor.apply(&cmd(K::SetBrightness).with_value(10), ms(0));
        processor.apply(&cmd(K::EnterSystemSetup), ms(0));
        processor.apply(&cmd(K::AdjustCalibration).with_value(20), ms(0));
        processor.apply(&cmd(K::SaveConfig), ms(0));

        processor.apply(&cmd(K::FactoryReset), ms(0));
        assert_eq!(processor.brightness(), 128);
        assert_eq!(processor.effect_index(), 0);
        assert_eq!(*processor.calibration(), SystemCalibration::default());
        assert_eq!(*processor.registry(), EffectRegistry::default());
        assert_eq!(
            processor.storage().static_state,
            Some(StaticState::capture(
                &SystemCalibration::default(),
                &EffectRegistry::default()
            ))
        );
        assert_eq!(processor.storage().volatile.map(|state| state.brightness), Some(128));
    }

    #[test]
    fn test_state_changes_are_broadcast() {
        let mut processor = synced_processor();
        let outcome = processor.apply(&cmd(K::TurnOn), ms(0));
        assert_eq!(outcome.broadcast.len(), 1);
        assert_eq!(outcome.broadcast[0].kind, K::TurnOn);

        let outcome = processor.apply(&cmd(K::AdjustBrightness).with_value(1), ms(0));
        assert_eq!(outcome.broadcast[0].kind, K::SetBrightness);
        assert_eq!(outcome.broadcast[0].value, 136);

        let outcome = processor.apply(&cmd(K::StepEffect).with_value(1), ms(0));
        assert_eq!(outcome.broadcast[0].kind, K::SetEffect);
        assert_eq!(outcome.broadcast[0].value, 1);

        // No change, nothing to mirror
        let outcome = processor.apply(&cmd(K::TurnOn), ms(0));
        assert!(outcome.broadcast.is_empty());
        let outcome = processor.apply(&cmd(K::SetMasked).with_value(1), ms(0));
        assert!(outcome.broadcast.is_empty());

        processor.apply(&cmd(K::SetSyncEnabled).with_value(0), ms(0));
        let outcome = processor.apply(&cmd(K::TurnOff), ms(0));
        assert!(outcome.broadcast.is_empty());
    }

    #[test]
    fn test_effect_select_previews_stay_local() {
        let mut processor = synced_processor();
        processor.apply(&cmd(K::TurnOn), ms(0));

        processor.apply(&cmd(K::EnterEffectSelect), ms(0));
        let outcome = processor.apply(&cmd(K::StepEffect).with_value(1), ms(10));
        assert!(outcome.dirty);
        assert!(outcome.broadcast.is_empty());
        let outcome = processor.apply(&cmd(K::CancelConfig), ms(20));
        assert!(outcome.broadcast.is_empty());
        assert_eq!(processor.effect_index(), 0);

        processor.apply(&cmd(K::EnterEffectSelect), ms(30));
        processor.apply(&cmd(K::StepEffect).with_value(1), ms(40));
        let outcome = processor.apply(&cmd(K::StepEffect).with_value(1), ms(50));
        assert!(outcome.broadcast.is_empty());
        let outcome = processor.apply(&cmd(K::SaveConfig), ms(60));
        assert_eq!(outcome.broadcast.len(), 1);
        assert_eq!(outcome.broadcast[0].kind, K::SetEffect);
        assert_eq!(outcome.broadcast[0].value, 2);
    }

    #[test]
    fn test_unchanged_effect_select_commit_is_not_broadcast() {
        let mut processor = synced_processor();
        processor.apply(&cmd(K::EnterEffectSelect), ms(0));
        processor.apply(&cmd(K::StepEffect).with_value(1), ms(10));
        processor.apply(&cmd(K::StepEffect).with_value(-1), ms(20));
        let outcome = processor.apply(&cmd(K::SaveConfig), ms(30));
        assert!(outcome.broadcast.is_empty());

        // A plain save outside any select mirrors nothing either
        let outcome = processor.apply(&cmd(K::SaveConfig), ms(40));
        assert!(outcome.broadcast.is_empty());
    }

    #[test]
    fn test_sync_and_save_broadcasts_full_effect() {
        let mut processor = synced_processor();
        processor.apply(&cmd(K::SetEffect).with_value(1), ms(0));
        processor.apply(&cmd(K::EnterEffectSetup), ms(0));
        let outcome = processor.apply(&cmd(K::AdjustEffectParam).with_value(2), ms(0));
        assert!(outcome.broadcast.is_empty());

        let outcome = processor.apply(&cmd(K::SyncAndSave), ms(0));
        let kinds: Vec<_> = outcome.broadcast.iter().map(|command| command.kind).collect();
        assert_eq!(
            kinds,
            vec![K::SetEffect, K::SetEffectParam, K::SetEffectParam, K::SaveConfig]
        );
        assert_eq!(outcome.broadcast[0].value, 1);
        assert_eq!((outcome.broadcast[1].param, outcome.broadcast[1].value), (0, 7));
        assert_eq!((outcome.broadcast[2].param, outcome.broadcast[2].value), (1, 4));
        assert_eq!(processor.storage().static_saves, 1);
        assert!(!processor.has_snapshot());
    }

    #[test]
    fn test_sync_and_save_without_sync_saves_locally() {
        let mut processor = processor();
        processor.apply(&cmd(K::EnterEffectSetup), ms(0));
        let outcome = processor.apply(&cmd(K::SyncAndSave), ms(0));
        assert!(outcome.broadcast.is_empty());
        assert_eq!(processor.storage().static_saves, 1);
    }
}
