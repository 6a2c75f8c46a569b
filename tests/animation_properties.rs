use ascii_matrix::compositor::{CellRole, Frame, FrameCompositor, Palette};
use ascii_matrix::driver::{AnimationDriver, DriverConfig, DriverState, SpawnPolicy};
use ascii_matrix::flow::{ColumnFlows, FlowLengthRange};
use ascii_matrix::grid::{CharacterGrid, ColorGrid, Rgb, Rgba};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn run(
    chars: &CharacterGrid,
    colors: Option<&ColorGrid>,
    config: DriverConfig,
    seed: u64,
) -> Vec<Frame> {
    AnimationDriver::new(chars, colors, config, StdRng::seed_from_u64(seed))
        .expect("driver should build")
        .collect()
}

fn is_trail_glyph(glyph: char) -> bool {
    ('!'..='~').contains(&glyph)
}

#[test]
fn three_by_three_single_flow_walkthrough() {
    let chars = CharacterGrid::from_rows(["...", "...", "..."]);
    let palette = Palette::default();
    let mut flows = ColumnFlows::new(3, 3);
    let mut compositor = FrameCompositor::new(3, 3, palette);
    let mut rng = StdRng::seed_from_u64(42);

    assert!(flows.spawn(0, 2));

    let frame0 = compositor.render(&chars, None, flows.columns(), &mut rng);
    let head = frame0.cell(0, 0).expect("cell");
    assert_eq!(head.role, CellRole::Head);
    assert_eq!(head.glyph, ' ');
    assert_eq!(head.color, Some(palette.head));
    assert_eq!(frame0.row_text(1), "...");
    assert_eq!(frame0.row_text(2), "...");

    assert!(!flows.advance(0, 2));
    assert_eq!(flows.get(0).and_then(|c| c.fall_position), Some(2));

    let frame1 = compositor.render(&chars, None, flows.columns(), &mut rng);
    assert_eq!(frame1.cell(0, 2).map(|c| c.role), Some(CellRole::Head));
    for y in 0..2 {
        let cell = frame1.cell(0, y).expect("cell");
        assert_eq!(cell.role, CellRole::Trail);
        assert!(is_trail_glyph(cell.glyph));
        assert_eq!(cell.color, Some(palette.trail));
    }

    assert!(!flows.advance(0, 2));
    let frame2 = compositor.render(&chars, None, flows.columns(), &mut rng);
    assert_eq!(frame2.cell(0, 0).map(|c| c.role), Some(CellRole::Settled));
    assert_eq!(frame2.cell(0, 1).map(|c| c.role), Some(CellRole::Settled));
    assert_eq!(frame2.cell(0, 2).map(|c| c.role), Some(CellRole::Trail));

    // 4 + 2 reaches height + length = 5
    assert!(flows.advance(0, 2));
    let state = flows.get(0).expect("column");
    assert!(!state.is_active());
    assert!(state.covered);
}

#[test]
fn frames_always_match_grid_shape() {
    let chars = CharacterGrid::from_rows(["abcdef", "ab", "abcd"]);
    let config = DriverConfig {
        skip_frames: 2,
        hold_frames: 2,
        ..DriverConfig::default()
    };
    let frames = run(&chars, None, config, 3);
    assert!(!frames.is_empty());
    for frame in &frames {
        assert_eq!(frame.width(), 6);
        assert_eq!(frame.height(), 3);
        assert_eq!(frame.cell(5, 1).map(|c| c.role), Some(CellRole::Padding));
    }
}

#[test]
fn same_seed_gives_identical_frames() {
    let chars = CharacterGrid::from_rows(vec!["#.#.#.#.".to_owned(); 6]);
    let config = DriverConfig {
        skip_frames: 3,
        ..DriverConfig::default()
    };
    let first = run(&chars, None, config.clone(), 1234);
    let second = run(&chars, None, config, 1234);
    assert_eq!(first, second);
}

#[test]
fn coverage_run_leaves_top_row_settled() {
    let chars = CharacterGrid::from_rows(vec!["........".to_owned(); 5]);
    let config = DriverConfig {
        skip_frames: 0,
        hold_frames: 4,
        flow_length: FlowLengthRange {
            min_ratio: 0.4,
            max_ratio: 0.4,
        },
        ..DriverConfig::default()
    };
    let frames = run(&chars, None, config, 77);
    let last = frames.last().expect("at least one frame");

    // two-row trails at speed 2 cross every row of a column
    for x in 0..8 {
        assert_eq!(
            last.cell(x, 0).and_then(|c| c.color),
            Some(Palette::default().settled)
        );
    }
}

#[test]
fn settled_cells_keep_settled_color_in_later_frames() {
    let chars = CharacterGrid::from_rows(["x", "x", "x", "x"]);
    let palette = Palette {
        settled: Rgb::new(1, 2, 3),
        ..Palette::default()
    };
    let config = DriverConfig {
        skip_frames: 0,
        hold_frames: 3,
        flow_length: FlowLengthRange {
            min_ratio: 0.5,
            max_ratio: 0.5,
        },
        palette,
        ..DriverConfig::default()
    };
    let frames = run(&chars, None, config, 5);

    let mut seen_settled = false;
    for frame in &frames {
        let cell = frame.cell(0, 0).expect("cell");
        if seen_settled {
            assert_ne!(cell.color, Some(palette.trail));
            assert_ne!(cell.role, CellRole::Original);
        }
        if cell.role == CellRole::Settled {
            seen_settled = true;
            assert_eq!(cell.color, Some(palette.settled));
        }
    }
    assert!(seen_settled);
}

#[test]
fn untouched_cells_keep_source_colors() {
    let chars = CharacterGrid::from_rows(["ab", "cd"]);
    let colors = ColorGrid::new(
        2,
        2,
        vec![
            Rgba::new(255, 0, 0, 255),
            Rgba::new(0, 0, 255, 255),
            Rgba::new(9, 9, 9, 0),
            Rgba::new(10, 20, 30, 128),
        ],
    )
    .expect("color grid");
    let config = DriverConfig {
        skip_frames: 10,
        ..DriverConfig::default()
    };
    let mut driver = AnimationDriver::new(&chars, Some(&colors), config, StdRng::seed_from_u64(0))
        .expect("driver");
    let frame = driver.next().expect("first frame");

    assert_eq!(frame.cell(0, 0).and_then(|c| c.color), Some(Rgb::new(255, 0, 0)));
    assert_eq!(frame.cell(1, 0).and_then(|c| c.color), Some(Rgb::new(0, 0, 255)));
    assert_eq!(frame.cell(0, 1).and_then(|c| c.color), Some(Rgb::new(50, 50, 50)));
    assert_eq!(frame.cell(1, 1).and_then(|c| c.color), Some(Rgb::new(10, 20, 30)));
    assert_eq!(frame.to_text(), "ab\ncd\n");
}

#[test]
fn probabilistic_run_has_no_hold_tail() {
    let chars = CharacterGrid::from_rows(vec!["....".to_owned(); 4]);
    let config = DriverConfig {
        skip_frames: 0,
        hold_frames: 30,
        spawn: SpawnPolicy::Probabilistic {
            frames: 40,
            chance: 1.0,
        },
        ..DriverConfig::default()
    };
    let frames = run(&chars, None, config, 8);
    assert_eq!(frames.len(), 40);
}

#[test]
fn coverage_runs_terminate_on_degenerate_shapes() {
    // (width, height); two-row grids draw flow lengths from int(0.4)..int(2.4)
    let shapes = [
        (1, 1),
        (1, 7),
        (1, 40),
        (7, 1),
        (40, 1),
        (2, 2),
        (5, 2),
        (13, 2),
        (3, 3),
    ];
    for (width, height) in shapes {
        let chars = CharacterGrid::from_rows(vec![".".repeat(width); height]);
        for seed in 0..8 {
            let config = DriverConfig {
                skip_frames: 3,
                hold_frames: 5,
                ..DriverConfig::default()
            };
            let mut driver =
                AnimationDriver::new(&chars, None, config, StdRng::seed_from_u64(seed))
                    .expect("driver should build");
            let frames = driver.by_ref().take(100_000).count();

            assert_eq!(driver.state(), DriverState::Done, "{width}x{height} seed {seed}");
            assert!(driver.flows().all_covered(), "{width}x{height} seed {seed}");
            assert_eq!(frames, driver.ticks() + 5, "{width}x{height} seed {seed}");
        }
    }
}
