use bytes::Bytes;
use slitscan::capture::{Frame, PixelFormat};
use slitscan::pipeline::{DelayMapPreset, ResizePolicy};
use slitscan::{EffectConfig, SlitScan, SlitScanError};

const W: u32 = 2;
const H: u32 = 2;
const PIXELS: usize = (W * H) as usize;

fn frame(value: u8) -> [u8; PIXELS] {
    [value; PIXELS]
}

/// Engine of `capacity` gray frames with frames 0, 10, 20, ... pushed oldest first
fn filled(capacity: usize, pushes: usize) -> SlitScan {
    let mut scan = SlitScan::new();
    scan.configure(W, H, capacity, PixelFormat::Gray).unwrap();
    for i in 0..pushes {
        scan.push(&frame(i as u8 * 10)).unwrap();
    }
    scan
}

fn constant_map(scan: &mut SlitScan, v: f32) {
    scan.set_delay_map_from_floats(&[v; PIXELS]).unwrap();
}

#[test]
fn ring_continuity() {
    for capacity in 1..=6 {
        let scan = filled(capacity, capacity);
        let newest = (capacity - 1) as u8 * 10;
        assert_eq!(scan.frame_at(0).unwrap(), &frame(newest));
        assert_eq!(scan.frame_at(capacity - 1).unwrap(), &frame(0));
    }
}

#[test]
fn wraparound_discards_the_oldest() {
    let scan = filled(4, 5);
    assert_eq!(scan.frame_at(3).unwrap(), &frame(10));
    assert_eq!(scan.frame_at(0).unwrap(), &frame(40));
    assert!(matches!(
        scan.frame_at(4),
        Err(SlitScanError::OffsetOutOfRange { offset: 4, capacity: 4 })
    ));
}

#[test]
fn window_invariant_holds_after_any_request() {
    let capacity = 7;
    let mut scan = filled(capacity, 0);
    for delay in 0..10 {
        for width in 0..10 {
            let _ = scan.set_delay_and_width(delay, width);
            let (d, w) = (scan.delay(), scan.width());
            assert!(d < capacity, "delay {d}");
            assert!((1..=capacity).contains(&w), "width {w}");
            assert!(d + w <= capacity, "{d} + {w}");
        }
    }
}

#[test]
fn oversized_window_resets_to_full_history() {
    let mut scan = filled(5, 0);
    let err = scan.set_delay_and_width(3, 4).unwrap_err();
    assert!(matches!(err, SlitScanError::InvalidWindow { .. }));
    assert_eq!((scan.delay(), scan.width()), (0, 5));
}

#[test]
fn constant_map_reproduces_one_history_frame() {
    let mut scan = filled(5, 5);
    // mapMin = 0, mapMax = 4: 0.5 lands on the third oldest frame
    constant_map(&mut scan, 0.5);
    assert_eq!(scan.output().unwrap(), &frame(20));

    constant_map(&mut scan, 0.0);
    assert_eq!(scan.output().unwrap(), &frame(0));

    constant_map(&mut scan, 1.0);
    assert_eq!(scan.output().unwrap(), &frame(40));
}

#[test]
fn delay_shifts_the_window_towards_the_past() {
    let mut scan = filled(5, 5);
    scan.set_delay_and_width(2, 3).unwrap();
    constant_map(&mut scan, 1.0);
    // mapMax = 5 - 1 - 2 = 2
    assert_eq!(scan.output().unwrap(), &frame(20));
}

#[test]
fn blending_interpolates_between_neighbours() {
    let mut scan = filled(5, 5);
    constant_map(&mut scan, 0.25);
    let nearest = scan.output().unwrap().to_vec();

    scan.set_blending(true);
    assert_eq!(scan.output().unwrap(), &nearest[..]);

    // precise = 1.5, halfway between 10 and 20
    constant_map(&mut scan, 0.375);
    assert_eq!(scan.output().unwrap(), &frame(15));

    // almost at the next frame
    constant_map(&mut scan, 0.4975);
    assert_eq!(scan.output().unwrap(), &frame(20));
}

#[test]
fn rejected_frames_leave_the_output_alone() {
    let mut scan = filled(3, 3);
    constant_map(&mut scan, 1.0);
    let before = scan.output().unwrap().to_vec();
    let map_before = scan.delay_map_visualization().unwrap().to_vec();

    let wrong_size = Frame::new(Bytes::from(vec![0u8; 9]), 1, 3, 3, PixelFormat::Gray);
    assert!(matches!(
        scan.push_frame(&wrong_size),
        Err(SlitScanError::DimensionMismatch { .. })
    ));
    let wrong_format = Frame::new(Bytes::from(vec![0u8; 12]), 2, W, H, PixelFormat::Rgb);
    assert!(matches!(
        scan.push_frame(&wrong_format),
        Err(SlitScanError::FormatMismatch { .. })
    ));
    assert!(matches!(
        scan.set_delay_map_from_pixels(&[0; 9], 3, 3, PixelFormat::Gray),
        Err(SlitScanError::DimensionMismatch { .. })
    ));

    assert_eq!(scan.output().unwrap(), &before[..]);
    assert_eq!(scan.delay_map_visualization().unwrap(), &map_before[..]);
}

#[test]
fn repeated_reads_do_not_recompute() {
    let mut scan = filled(4, 4);
    constant_map(&mut scan, 0.5);
    let first = scan.output().unwrap().to_vec();
    let recomputes = scan.stats().output_recomputes;

    let second = scan.output().unwrap().to_vec();
    assert_eq!(first, second);
    assert_eq!(scan.stats().output_recomputes, recomputes);

    scan.push(&frame(99)).unwrap();
    scan.output().unwrap();
    assert_eq!(scan.stats().output_recomputes, recomputes + 1);
}

#[test]
fn growth_preserves_history() {
    let mut scan = filled(4, 6);
    let before: Vec<Vec<u8>> = (0..4).map(|age| scan.frame_at(age).unwrap().to_vec()).collect();

    assert_eq!(scan.resize(7).unwrap(), 7);
    for (age, expected) in before.iter().enumerate() {
        assert_eq!(scan.frame_at(age).unwrap(), &expected[..]);
    }
    for age in 4..7 {
        assert_eq!(scan.frame_at(age).unwrap(), &frame(0));
    }

    scan.push(&frame(200)).unwrap();
    assert_eq!(scan.frame_at(0).unwrap(), &frame(200));
    assert_eq!(scan.frame_at(1).unwrap(), &before[0][..]);
}

#[test]
fn shrink_keeps_the_newest_frames() {
    let mut scan = filled(5, 7);
    assert_eq!(scan.resize(2).unwrap(), 2);
    assert_eq!(scan.frame_at(0).unwrap(), &frame(60));
    assert_eq!(scan.frame_at(1).unwrap(), &frame(50));
}

#[test]
fn slot_order_shrink_truncates_slots() {
    let mut scan = SlitScan::new().with_resize_policy(ResizePolicy::SlotOrder);
    scan.configure(W, H, 4, PixelFormat::Gray).unwrap();
    for v in [10, 20, 30, 40, 50] {
        scan.push(&frame(v)).unwrap();
    }
    // slots are [50, 20, 30, 40] with the write pointer on slot 1
    scan.resize(2).unwrap();
    // slots [50, 20], write pointer 1: newest is slot 0
    assert_eq!(scan.frame_at(0).unwrap(), &frame(50));
    assert_eq!(scan.frame_at(1).unwrap(), &frame(20));
}

#[test]
fn resize_revalidates_the_window() {
    let mut scan = filled(8, 8);
    scan.set_delay_and_width(3, 5).unwrap();
    scan.resize(4).unwrap();
    let (d, w) = (scan.delay(), scan.width());
    assert!(d + w <= 4 && w >= 1 && d < 4);
}

#[test]
fn filmstrip_spreads_over_history() {
    let scan = filled(6, 6);
    let strip = scan.filmstrip(3).unwrap();
    assert_eq!(strip.len(), 3);
    assert_eq!(strip[0], &frame(50));
    assert_eq!(strip[1], &frame(30));
    assert_eq!(strip[2], &frame(10));

    assert_eq!(scan.filmstrip(20).unwrap().len(), 6);
}

#[test]
fn settings_drive_the_engine() {
    let config = EffectConfig {
        width: 4,
        height: 3,
        capacity: 10,
        format: PixelFormat::Rgb,
        blending: true,
        delay: 2,
        window: Some(5),
        delay_map_preset: DelayMapPreset::RightToLeft,
        ..EffectConfig::default()
    };
    let mut scan = SlitScan::new();
    scan.apply_settings(&config).unwrap();
    assert_eq!(scan.capacity(), 10);
    assert_eq!((scan.delay(), scan.width()), (2, 5));
    assert!(scan.is_blending());
    assert_eq!(scan.format(), Some(PixelFormat::Rgb));

    scan.push(&[7; 36]).unwrap();
    let resized = EffectConfig {
        capacity: 20,
        ..config
    };
    scan.apply_settings(&resized).unwrap();
    assert_eq!(scan.capacity(), 20);
    assert_eq!(scan.frame_at(0).unwrap(), &[7; 36]);
}
