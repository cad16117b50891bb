use proptest::prelude::*;
use rhythm_dino_core::{score_for_delta, RhythmLevel, RhythmTimeline, ScoringConfig};

const PATTERN_BEATS: f64 = 16.0;
const EPSILON: f64 = 1e-6;

fn level_strategy() -> impl Strategy<Value = RhythmLevel> {
    (
        40.0f64..240.0,
        0u32..300,
        0.0f64..4.0,
        prop::collection::vec(0.0f64..PATTERN_BEATS, 1..24),
    )
        .prop_map(|(tempo, window_ms, count_in, mut beats)| {
            beats.sort_by(f64::total_cmp);
            let points = beats
                .into_iter()
                .enumerate()
                .map(|(i, beat)| (beat, format!("p{i}")));
            RhythmLevel::new("prop", "Prop", tempo, window_ms, 300.0, PATTERN_BEATS, points)
                .with_count_in(count_in)
        })
}

proptest! {
    #[test]
    fn expected_times_follow_beat_order(level in level_strategy()) {
        let timeline = RhythmTimeline::new(&level).unwrap();
        for pair in timeline.events().windows(2) {
            prop_assert!(pair[0].expected_time <= pair[1].expected_time);
        }
    }

    #[test]
    fn hits_on_expected_times_resolve_everything(
        level in level_strategy(),
        distance in 0.0f64..2000.0,
    ) {
        let mut timeline = RhythmTimeline::new(&level).unwrap();
        timeline.assign_spawn_times(distance, level.base_speed);

        let expected: Vec<f64> = timeline.events().iter().map(|e| e.expected_time).collect();
        for (index, time) in expected.into_iter().enumerate() {
            let matched = timeline.register_hit(time).unwrap();
            prop_assert_eq!(matched.index, index);
            prop_assert_eq!(timeline.events()[index].accuracy_ms, Some(0.0));
        }
        prop_assert!(timeline.is_complete());
        prop_assert_eq!(timeline.completion_ratio(), 1.0);
        for event in timeline.events() {
            prop_assert!(event.spawn_time >= 0.0);
            prop_assert!(event.spawn_time <= event.expected_time);
        }
    }

    #[test]
    fn window_edges_are_inclusive(level in level_strategy(), late in any::<bool>()) {
        let timeline = RhythmTimeline::new(&level).unwrap();
        let first = timeline.events()[0].clone();
        let offset = if late { first.window_seconds() } else { -first.window_seconds() };

        let mut edge = timeline.clone();
        prop_assert!(edge.register_hit(first.expected_time + offset).is_some());

        let nudge = if late { EPSILON } else { -EPSILON };
        let mut outside = timeline.clone();
        prop_assert!(outside.register_hit(first.expected_time + offset + nudge).is_none());
        prop_assert_eq!(outside.cursor(), 0);
    }

    #[test]
    fn timeouts_wait_for_the_window(level in level_strategy(), slack in 0.0f64..1.0) {
        let mut timeline = RhythmTimeline::new(&level).unwrap();
        let first = timeline.events()[0].clone();
        let deadline = first.expected_time + first.window_seconds();

        prop_assert!(timeline.next_timeout(deadline * slack.min(1.0 - EPSILON)).is_none());
        prop_assert!(timeline.next_timeout(deadline).is_none());
        prop_assert!(timeline.next_timeout(deadline + EPSILON + slack).is_some());
        prop_assert_eq!(timeline.cursor(), 1);
    }

    #[test]
    fn reset_forgets_any_outcome(level in level_strategy(), hits in prop::collection::vec(0.0f64..30.0, 0..40)) {
        let mut timeline = RhythmTimeline::new(&level).unwrap();
        for now in hits {
            timeline.register_hit(now);
            timeline.next_timeout(now);
        }

        timeline.reset();

        prop_assert_eq!(timeline.cursor(), 0);
        prop_assert_eq!(timeline.completion_ratio(), 0.0);
        prop_assert!(!timeline.is_complete());
    }

    #[test]
    fn closer_hits_never_score_less(
        window_ms in 1u32..300,
        a in 0.0f64..1.0,
        b in 0.0f64..1.0,
        combo in 0u32..50,
        early in any::<bool>(),
    ) {
        let config = ScoringConfig::default();
        let window = f64::from(window_ms) / 1000.0;
        let (near, far) = if a <= b { (a * window, b * window) } else { (b * window, a * window) };
        let sign = if early { -1.0 } else { 1.0 };

        let near_score = score_for_delta(sign * near, window_ms, combo, &config);
        let far_score = score_for_delta(sign * far, window_ms, combo, &config);
        prop_assert!(near_score >= far_score);
        prop_assert!(far_score >= 30 + combo * config.streak_unit);
    }
}
