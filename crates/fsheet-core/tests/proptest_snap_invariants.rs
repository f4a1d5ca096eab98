#![forbid(unsafe_code)]

//! Property-based invariants for snap geometry and gesture arbitration.
//!
//! 1. **Profile ordering**: every constructed or derived profile satisfies
//!    `expanded <= middle <= collapsed <= (hidden ?? collapsed)`.
//! 2. **Clamp range**: `clamp` always lands inside
//!    `[expanded, dismiss_or_collapsed]`.
//! 3. **Release is a candidate**: the resolved destination is one of the
//!    profile's candidates, and never `hidden` when dismissal is off.
//! 4. **Flings**: a strong upward fling always opens fully; a strong
//!    downward fling always dismisses when allowed.
//! 5. **Axis lock**: a stream that moves mostly sideways before showing
//!    vertical intent never produces a drag offset.
//! 6. **Spring convergence**: every preset settles exactly on its target.

use std::time::Duration;

use fsheet_core::config::{ArbiterConfig, SnapModelConfig, SpringConfig};
use fsheet_core::geometry::{SnapKey, SnapProfile};
use fsheet_core::gesture::{
    ArbiterInputs, ArbiterOutcome, Classification, GestureArbiter, ScrollSnapshot, TouchEvent,
    resolve_release,
};
use fsheet_core::snap::{LayoutInputs, derive};
use fsheet_core::spring::{Spring, presets};
use proptest::prelude::*;
use web_time::Instant;

fn is_ordered(p: &SnapProfile) -> bool {
    p.expanded() <= p.middle()
        && p.middle() <= p.collapsed()
        && p.collapsed() <= p.hidden().unwrap_or(p.collapsed())
}

fn any_measure() -> impl Strategy<Value = f64> {
    prop_oneof![
        4 => -100.0f64..2000.0,
        1 => Just(0.0),
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

fn any_profile() -> impl Strategy<Value = SnapProfile> {
    (
        0.0f64..200.0,
        0.0f64..400.0,
        0.0f64..400.0,
        0.0f64..200.0,
        any::<bool>(),
    )
        .prop_map(|(e, gap1, gap2, gap3, dismissible)| {
            SnapProfile::new(e, e + gap1, e + gap1 + gap2, dismissible.then_some(e + gap1 + gap2 + gap3))
        })
}

proptest! {
    #[test]
    fn constructed_profiles_are_ordered(
        e in any_measure(),
        m in any_measure(),
        c in any_measure(),
        h in proptest::option::of(any_measure()),
    ) {
        let p = SnapProfile::new(e, m, c, h);
        prop_assert!(is_ordered(&p), "{p:?}");
    }

    #[test]
    fn derived_profiles_are_ordered(
        screen_height in any_measure(),
        safe_area_top in any_measure(),
        safe_area_bottom in any_measure(),
        nav_bar_top in any_measure(),
        nav_bar_height in any_measure(),
        header_height in any_measure(),
        dismissible in any::<bool>(),
    ) {
        let inputs = LayoutInputs {
            screen_height,
            safe_area_top,
            safe_area_bottom,
            nav_bar_top,
            nav_bar_height,
            header_height,
        };
        let p = derive(&SnapModelConfig::default(), &inputs, dismissible);
        prop_assert!(is_ordered(&p), "{p:?} from {inputs:?}");
        prop_assert!(p.expanded().is_finite());
        prop_assert_eq!(p.is_dismissible(), dismissible);
    }

    #[test]
    fn clamp_stays_in_range(p in any_profile(), offset in any_measure()) {
        let c = p.clamp(offset);
        prop_assert!(c >= p.expanded() && c <= p.dismiss_or_collapsed());
    }

    #[test]
    fn release_lands_on_a_candidate(
        p in any_profile(),
        frac in 0.0f64..1.0,
        velocity in -6000.0f64..6000.0,
        dismissible in any::<bool>(),
    ) {
        let current = p.expanded() + frac * (p.dismiss_or_collapsed() - p.expanded());
        let key = resolve_release(&p, current, velocity, &ArbiterConfig::default(), dismissible);
        let allowed = p.candidates(dismissible && p.is_dismissible());
        prop_assert!(allowed.iter().any(|(k, _)| *k == key), "{key:?} not in {allowed:?}");
        if !dismissible {
            prop_assert_ne!(key, SnapKey::Hidden);
        }
    }

    #[test]
    fn flings_pick_the_extremes(p in any_profile(), frac in 0.0f64..1.0, speed in 2600.0f64..9000.0) {
        let config = ArbiterConfig::default();
        let current = p.expanded() + frac * (p.dismiss_or_collapsed() - p.expanded());
        prop_assert_eq!(resolve_release(&p, current, -speed, &config, true), SnapKey::Expanded);
        let down = resolve_release(&p, current, speed, &config, true);
        if p.is_dismissible() {
            prop_assert_eq!(down, SnapKey::Hidden);
        } else {
            prop_assert_eq!(down, SnapKey::Collapsed);
        }
    }

    #[test]
    fn sideways_streams_never_drag(
        dx in prop_oneof![12.0f64..300.0, -300.0f64..-12.0],
        ratio in 0.0f64..0.85,
        tail in proptest::collection::vec((-200.0f64..200.0, -200.0f64..200.0), 0..8),
    ) {
        let profile = SnapProfile::new(0.0, 300.0, 600.0, Some(700.0));
        let inputs = ArbiterInputs {
            offset: 300.0,
            profile,
            scroll: ScrollSnapshot::default(),
            header_height: 60.0,
            dismissible: true,
        };
        let mut arbiter = GestureArbiter::new(ArbiterConfig::default());
        let base = Instant::now();
        let (x0, y0) = (100.0, 320.0);
        arbiter.process(TouchEvent::Down { x: x0, y: y0, at: base }, &inputs);

        // |dy| < |dx| / 1.15 on the first move past slop.
        let dy = dx.abs() * ratio;
        let first = arbiter.process(
            TouchEvent::Move { x: x0 + dx, y: y0 + dy, at: base + Duration::from_millis(16) },
            &inputs,
        );
        prop_assert!(matches!(first, ArbiterOutcome::HandedOff(_)), "{first:?}");
        prop_assert_eq!(arbiter.classification(), Some(Classification::HorizontalHandoff));

        for (i, (tx, ty)) in tail.iter().enumerate() {
            let out = arbiter.process(
                TouchEvent::Move {
                    x: x0 + tx,
                    y: y0 + ty,
                    at: base + Duration::from_millis(32 + 16 * i as u64),
                },
                &inputs,
            );
            prop_assert!(!matches!(out, ArbiterOutcome::Dragged { .. } | ArbiterOutcome::Claimed { .. }), "unexpected outcome: {:?}", out);
        }
        let up = arbiter.process(TouchEvent::Up { x: x0, y: y0, at: base + Duration::from_secs(1) }, &inputs);
        prop_assert_eq!(up, ArbiterOutcome::Ignored);
    }

    #[test]
    fn presets_converge(
        from in -1000.0f64..1000.0,
        to in -1000.0f64..1000.0,
        v0 in -5000.0f64..5000.0,
        which in 0usize..3,
    ) {
        let config: SpringConfig = match which {
            0 => presets::settle(),
            1 => presets::snappy(),
            _ => presets::gentle(),
        };
        let mut spring = Spring::new(from, to, v0, &config);
        let mut frames = 0;
        while !spring.advance(Duration::from_millis(16)) {
            frames += 1;
            prop_assert!(frames < 2000, "did not settle: {spring:?}");
        }
        prop_assert_eq!(spring.position(), to);
    }
}
