//! End-to-end tests of the device pipeline.
//!
//! Each test acquires a headless device and returns early when the machine
//! has no usable adapter.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use physarum::shader_utils::{wrap_angle, PI as COARSE_PI};
use physarum::{
    Agent, AgentLayerConfig, Diagnostics, FieldFingerprint, FieldName, GpuContext,
    GradientDirection, LandscapePattern, Palette, Physarum, PhysarumError, Rgb,
    SimulationConfig, SpawnContext, SpawnShape, Vec2,
};

const PALETTE: [&str; 4] = ["#102030", "#ff0000", "#00ff00", "#0000ff"];

fn gpu() -> Option<Arc<GpuContext>> {
    match GpuContext::headless() {
        Ok(ctx) => Some(Arc::new(ctx)),
        Err(e) => {
            eprintln!("skipping GPU test: {}", e);
            None
        }
    }
}

fn stacked(count: usize, x: f32, y: f32) -> AgentLayerConfig {
    AgentLayerConfig::new(vec![Agent::new(x, y, 0.0); count])
}

fn base_config(width: u32, height: u32) -> SimulationConfig {
    SimulationConfig::new("test", width, height).with_palette(PALETTE)
}

fn busy_config() -> SimulationConfig {
    let mut spawn = SpawnContext::new(96, 64, 5);
    let ring = SpawnShape::Ring { radius: 0.3 }.spawn(&mut spawn, 700);
    let cloud = SpawnShape::Gaussian { std_dev: 0.2 }.spawn(&mut spawn, 500);
    base_config(96, 64)
        .with_diffusion(true)
        .with_landscape(LandscapePattern::Checkerboard { num_cells: 4 })
        .with_border(true)
        .with_layer(AgentLayerConfig::new(ring).with_tex_scale([1.0, -0.5, 0.0]))
        .with_layer(
            AgentLayerConfig::new(cloud)
                .with_sensor(12.0, 0.6)
                .with_land_scale(-0.3)
                .with_tex_scale([-0.5, 1.0, 0.0])
                .with_point_size(2.0),
        )
}

#[test]
fn test_stacked_agents_accumulate() {
    let Some(ctx) = gpu() else { return };

    for (count, expected) in [(1, 0.5), (4, 2.0)] {
        let config = base_config(64, 64)
            .with_decay(0.5)
            .with_layer(stacked(count, 0.0, 0.0).with_rotation_amount(std::f32::consts::FRAC_PI_4));
        let mut sim = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
        sim.deposit_and_diffuse();

        let trail = sim.read_trail().unwrap();
        assert_eq!(trail[0], [expected, 0.0, 0.0], "{count} agents");
        assert!(trail[1..].iter().all(|t| *t == [0.0; 3]));
    }
}

#[test]
fn test_layers_use_their_own_channel() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(16, 16)
        .with_decay(0.0)
        .with_layer(stacked(2, 3.0, 3.0))
        .with_layer(stacked(1, 3.0, 3.0).with_deposit(0.5))
        .with_layer(stacked(3, 10.0, 12.0));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();

    let deposit = sim.read_deposit().unwrap();
    assert_eq!(deposit[3 * 16 + 3], [2.0, 0.5, 0.0]);
    assert_eq!(deposit[12 * 16 + 10], [0.0, 0.0, 3.0]);
    let touched = deposit.iter().filter(|d| **d != [0.0; 3]).count();
    assert_eq!(touched, 2);
}

#[test]
fn test_point_size_covers_square() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(16, 16).with_layer(stacked(1, 5.2, 7.9).with_point_size(3.0));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();

    let deposit = sim.read_deposit().unwrap();
    for y in 0..16 {
        for x in 0..16 {
            let inside = (4..=6).contains(&x) && (6..=8).contains(&y);
            let expected = if inside { 1.0 } else { 0.0 };
            assert_eq!(deposit[y * 16 + x][0], expected, "texel ({x}, {y})");
        }
    }
}

#[test]
fn test_deposit_zero_after_clear() {
    let Some(ctx) = gpu() else { return };

    let mut sim = Physarum::new(ctx, &busy_config(), Diagnostics::disabled()).unwrap();
    sim.run(5);
    assert!(sim.read_deposit().unwrap().iter().any(|d| *d != [0.0; 3]));

    sim.clear_deposit();
    assert!(sim.read_deposit().unwrap().iter().all(|d| *d == [0.0; 3]));
}

#[test]
fn test_agents_stay_in_domain() {
    let Some(ctx) = gpu() else { return };

    let config = busy_config();
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.run(40);

    assert_eq!(sim.frame(), 40);
    for (layer, layer_config) in sim.layers().iter().zip(&config.layers) {
        let agents = layer.read_agents(sim.context()).unwrap();
        assert_eq!(agents.len(), layer_config.num_agents());
        for agent in agents {
            assert!(agent.position.x >= 0.0 && agent.position.x < 96.0);
            assert!(agent.position.y >= 0.0 && agent.position.y < 64.0);
            assert!(agent.heading >= 0.0 && agent.heading < physarum::shader_utils::TAU);
        }
    }
}

#[test]
fn test_edge_agent_turns_around() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(64, 64).with_layer(AgentLayerConfig::new(vec![Agent::new(63.5, 10.0, 0.0)]));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.step();

    let agents = sim.layers()[0].read_agents(sim.context()).unwrap();
    assert_eq!(agents[0].position.x, 63.5);
    assert_eq!(agents[0].position.y, 10.0);
    assert_eq!(agents[0].heading, COARSE_PI);
}

#[test]
fn test_free_agent_moves_on_grid() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(64, 64).with_layer(AgentLayerConfig::new(vec![Agent::new(20.0, 20.0, 0.0)]));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.run(3);

    let agent = sim.layers()[0].read_agents(sim.context()).unwrap()[0];
    assert_eq!(agent.position.x, 23.0);
    assert_eq!(agent.position.y, 20.0);
    assert_eq!(agent.heading, 0.0);
}

fn steering_config(landscape: LandscapePattern, agents: Vec<Agent>) -> SimulationConfig {
    base_config(64, 64).with_landscape(landscape).with_layer(
        AgentLayerConfig::new(agents)
            .with_sensor(9.0, std::f32::consts::PI / 4.0)
            .with_rotation_amount(std::f32::consts::PI / 4.0)
            .with_land_scale(1.0),
    )
}

fn rising_in_y(flip_y: bool) -> LandscapePattern {
    LandscapePattern::LinearGradient {
        flip_x: false,
        flip_y,
        direction: GradientDirection::Vertical,
    }
}

#[test]
fn test_agent_turns_towards_stronger_side() {
    let Some(ctx) = gpu() else { return };
    let rotation = std::f32::consts::PI / 4.0;

    // Heading along +x, the right sensor (heading + angle) sits higher in y.
    let config = steering_config(rising_in_y(false), vec![Agent::new(32.5, 32.5, 0.0)]);
    let mut sim = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
    sim.step();
    let agent = sim.layers()[0].read_agents(sim.context()).unwrap()[0];
    assert_eq!(agent.heading, rotation);

    // Mirrored landscape, the left sensor wins.
    let config = steering_config(rising_in_y(true), vec![Agent::new(32.5, 32.5, 0.0)]);
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.step();
    let agent = sim.layers()[0].read_agents(sim.context()).unwrap()[0];
    assert!((agent.heading - wrap_angle(-rotation)).abs() < 1e-6);
}

#[test]
fn test_tied_sensors_keep_heading() {
    let Some(ctx) = gpu() else { return };

    let config = steering_config(
        LandscapePattern::Flat { value: 0.5 },
        vec![Agent::new(30.0, 30.0, 1.0), Agent::new(12.0, 40.0, 4.0)],
    );
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.step();

    let agents = sim.layers()[0].read_agents(sim.context()).unwrap();
    assert_eq!(agents[0].heading, 1.0);
    assert_eq!(agents[1].heading, 4.0);
    assert_ne!(agents[0].position, Vec2::new(30.0, 30.0));
}

#[test]
fn test_local_minimum_turns_every_agent_the_same_way() {
    let Some(ctx) = gpu() else { return };
    let rotation = std::f32::consts::PI / 4.0;
    let down = 1.5 * std::f32::consts::PI;

    // Facing down a slope rising in y, both side sensors read higher than
    // the center.
    let agents: Vec<Agent> = (0..6).map(|i| Agent::new(16.5 + 6.0 * i as f32, 40.25, down)).collect();
    let mut signs = Vec::new();
    for seed in 0..16 {
        let mut config = steering_config(rising_in_y(false), agents.clone());
        config.seed = format!("turn-{}", seed);
        let mut sim = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
        sim.step();

        let headings: Vec<f32> = sim.layers()[0]
            .read_agents(sim.context())
            .unwrap()
            .iter()
            .map(|a| a.heading)
            .collect();
        assert!(headings.iter().all(|h| *h == headings[0]), "{:?}", headings);

        let sign = if (headings[0] - wrap_angle(down + rotation)).abs() < 1e-5 {
            1
        } else {
            assert!((headings[0] - wrap_angle(down - rotation)).abs() < 1e-5);
            -1
        };
        signs.push(sign);
    }
    // The shared direction is drawn per step, so seeds disagree.
    assert!(signs.contains(&1) && signs.contains(&-1));
}

#[test]
fn test_same_seed_same_fingerprints() {
    let Some(ctx) = gpu() else { return };

    let config = busy_config();
    let mut a = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
    let mut b = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
    a.run(25);
    b.run(25);

    let fa = a.fingerprints().unwrap();
    let fb = b.fingerprints().unwrap();
    assert_eq!(fa.len(), 2 + 3);
    assert_eq!(fa, fb);
    assert!(fa.iter().all(FieldFingerprint::is_finite));

    let mut other = config.clone();
    other.seed = "another".to_string();
    let mut c = Physarum::new(ctx, &other, Diagnostics::disabled()).unwrap();
    c.run(25);
    let fc = c.fingerprints().unwrap();
    // Landscape does not depend on the master seed.
    assert_eq!(fa[4], fc[4]);
}

#[test]
fn test_diagnostics_capture_at_frame() {
    let Some(ctx) = gpu() else { return };

    let seen: Rc<RefCell<Vec<(FieldName, u64)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let diagnostics = Diagnostics::new(move |fp: &FieldFingerprint, frame| {
        sink.borrow_mut().push((fp.field, frame));
    })
    .capture_at(3);

    let mut sim = Physarum::new(ctx, &busy_config(), diagnostics).unwrap();
    sim.run(5);

    assert_eq!(
        *seen.borrow(),
        vec![
            (FieldName::AgentLayer(0), 3),
            (FieldName::AgentLayer(1), 3),
            (FieldName::Deposit, 3),
            (FieldName::Trail, 3),
            (FieldName::Landscape, 3),
        ]
    );
}

#[test]
fn test_decay_only_has_no_cross_texel_influence() {
    let Some(ctx) = gpu() else { return };

    let config = busy_config().with_diffusion(false);
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();

    let deposit = sim.read_deposit().unwrap();
    let trail = sim.read_trail().unwrap();
    let keep = 1.0 - config.decay;
    for (d, t) in deposit.iter().zip(&trail) {
        for c in 0..3 {
            let expected = ((d[c] * 1024.0) as i32) as f32 * keep / 1024.0;
            assert!((t[c] - expected).abs() < 1e-6);
        }
    }
}

#[test]
fn test_diffusion_spreads_to_neighbors() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(16, 16)
        .with_diffusion(true)
        .with_decay(0.0)
        .with_layer(stacked(1, 8.0, 8.0));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();

    let trail = sim.read_trail().unwrap();
    let at = |x: usize, y: usize| trail[y * 16 + x][0];
    // 10/26 of the deposit stays, 3/26 goes to each side, 1/26 to each corner.
    assert_eq!(at(8, 8), (10 * 1024 / 26) as f32 / 1024.0);
    assert_eq!(at(9, 8), (3 * 1024 / 26) as f32 / 1024.0);
    assert_eq!(at(9, 9), (1024 / 26) as f32 / 1024.0);
    assert_eq!(at(11, 8), 0.0);
}

#[test]
fn test_uniform_landscape_only_rescales_weights() {
    let Some(ctx) = gpu() else { return };

    let spread = |value: f32| {
        let config = base_config(16, 16)
            .with_diffusion(true)
            .with_decay(0.0)
            .with_landscape(LandscapePattern::Flat { value })
            .with_layer(stacked(1, 8.0, 8.0));
        let mut sim = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
        sim.deposit_and_diffuse();
        sim.read_trail().unwrap()
    };

    // Same resistance everywhere cancels out of the weighted mean.
    let half = spread(0.5);
    assert_eq!(half, spread(0.0));
    assert_eq!(half[8 * 16 + 9][0], (3 * 1024 / 26) as f32 / 1024.0);

    // Full resistance leaves no weight at all, so nothing moves.
    let blocked = spread(1.0);
    assert_eq!(blocked[8 * 16 + 8][0], 1.0);
    assert_eq!(blocked[8 * 16 + 9][0], 0.0);
    assert_eq!(blocked[9 * 16 + 9][0], 0.0);
}

#[test]
fn test_landscape_resists_diffusion() {
    let Some(ctx) = gpu() else { return };

    let config = busy_config();
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();

    let (w, h) = sim.dims();
    let (w, h) = (w as i32, h as i32);
    let landscape = sim.read_landscape().unwrap();
    let deposit: Vec<[i32; 3]> = sim
        .read_deposit()
        .unwrap()
        .iter()
        .map(|d| d.map(|v| (v * 1024.0) as i32))
        .collect();
    let trail = sim.read_trail().unwrap();

    let mut levels = landscape.clone();
    levels.sort_by(f32::total_cmp);
    levels.dedup();
    assert!(levels.len() > 2, "checkerboard should not be flat");

    let keep = 1.0 - config.decay;
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let mut sum = 0i32;
                let mut weights = 0i32;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let n = (ny * w + nx) as usize;
                        let kernel = match (dx, dy) {
                            (0, 0) => 10,
                            (0, _) | (_, 0) => 3,
                            _ => 1,
                        };
                        let weight = kernel * (1024.0 * (1.0 - landscape[n])) as i32;
                        sum = sum.max(sum.wrapping_add(deposit[n][c].wrapping_mul(weight)));
                        weights = weights.max(weights + weight);
                    }
                }
                let i = (y * w + x) as usize;
                let result = if weights != 0 { sum / weights } else { deposit[i][c] };
                let expected = result as f32 * keep / 1024.0;
                let got = trail[i][c];
                assert!(
                    (got - expected).abs() <= 1e-5 * expected.abs().max(1.0),
                    "texel ({}, {}) channel {}: {} != {}",
                    x,
                    y,
                    c,
                    got,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_diffusion_drops_out_of_bounds_neighbors() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(16, 16)
        .with_diffusion(true)
        .with_decay(0.0)
        .with_layer(AgentLayerConfig::new(vec![
            Agent::new(0.0, 0.0, 0.0),
            Agent::new(8.0, 0.0, 0.0),
        ]));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();

    let trail = sim.read_trail().unwrap();
    let at = |x: usize, y: usize| trail[y * 16 + x][0];
    let share = |part: i32, total: i32| (part * 1024 / total) as f32 / 1024.0;

    // The corner texel sees four neighbors: 10 + 3 + 3 + 1.
    assert_eq!(at(0, 0), share(10, 17));
    // Bottom edge texels see six: 3 + 10 + 3 + 1 + 3 + 1.
    assert_eq!(at(1, 0), share(3, 21));
    assert_eq!(at(8, 0), share(10, 21));
    assert_eq!(at(7, 0), share(3, 21));
    assert_eq!(at(9, 0), share(3, 21));
    // Interior texels keep the full kernel.
    assert_eq!(at(1, 1), share(1, 26));
    assert_eq!(at(8, 1), share(3, 26));
    assert_eq!(at(3, 0), 0.0);
}

#[test]
fn test_empty_trail_draws_background() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(20, 10).with_layer(stacked(1, 5.0, 5.0));
    let sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    let image = sim.draw().unwrap();

    let background = Rgb::from_hex(PALETTE[0]).unwrap().to_rgba8();
    assert_eq!(image.dimensions(), (20, 10));
    assert!(image.pixels().all(|p| p.0 == background));
}

#[test]
fn test_saturated_channel_draws_foreground() {
    let Some(ctx) = gpu() else { return };

    let config = base_config(8, 8)
        .with_decay(0.0)
        .with_layer(stacked(16, 0.0, 0.0));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();
    let image = sim.draw().unwrap();

    let palette: Palette = PALETTE.join("-").replace('#', "").parse().unwrap();
    // Texel (0, 0) is the bottom-left pixel of the image.
    assert_eq!(image.get_pixel(0, 7).0, palette.foreground[0].to_rgba8());
    assert_eq!(image.get_pixel(7, 0).0, palette.background.to_rgba8());
}

#[test]
fn test_overlapping_channels_blend_by_share() {
    let Some(ctx) = gpu() else { return };

    let mut first = vec![Agent::new(0.0, 0.0, 0.0); 16];
    first.extend(vec![Agent::new(4.0, 0.0, 0.0); 2]);
    first.extend(vec![Agent::new(8.0, 0.0, 0.0); 2]);
    let mut second = vec![Agent::new(0.0, 0.0, 0.0); 16];
    second.extend(vec![Agent::new(4.0, 0.0, 0.0); 16]);

    let config = base_config(16, 8)
        .with_palette(["#000000", "#ff0000", "#00ff00", "#0000ff"])
        .with_decay(0.0)
        .with_layer(AgentLayerConfig::new(first))
        .with_layer(AgentLayerConfig::new(second));
    let mut sim = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();
    sim.deposit_and_diffuse();
    let image = sim.draw().unwrap();

    let close = |got: [u8; 4], want: [u8; 4]| {
        assert!(
            got.iter().zip(want).all(|(g, w)| (*g as i32 - w as i32).abs() <= 1),
            "{:?} != {:?}",
            got,
            want
        );
    };
    // Both saturated: an even mix at full strength.
    close(image.get_pixel(0, 7).0, [128, 128, 0, 255]);
    // Half and full: the mix follows the shares, strength follows the max.
    close(image.get_pixel(4, 7).0, [85, 170, 0, 255]);
    // Half of one channel alone: halfway from the background.
    close(image.get_pixel(8, 7).0, [128, 0, 0, 255]);
}

#[test]
fn test_landscape_is_idempotent_and_static() {
    let Some(ctx) = gpu() else { return };

    let config = busy_config().with_landscape(LandscapePattern::LinearGradient {
        flip_x: false,
        flip_y: true,
        direction: GradientDirection::Diagonal,
    });
    let mut a = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
    let b = Physarum::new(ctx, &config, Diagnostics::disabled()).unwrap();

    let before = a.read_landscape().unwrap();
    assert_eq!(before, b.read_landscape().unwrap());
    a.run(10);
    assert_eq!(before, a.read_landscape().unwrap());
}

#[test]
fn test_every_landscape_in_unit_range() {
    let Some(ctx) = gpu() else { return };

    let patterns = [
        LandscapePattern::Flat { value: 0.25 },
        LandscapePattern::RadialGradient { towards_center: true },
        LandscapePattern::Noise {
            seed: 3,
            scale: 4.0,
            max_noise: 0.3,
        },
        LandscapePattern::CentralSquare {
            radius: 0.25,
            line_width: 0.05,
        },
        LandscapePattern::CornerCircles {
            radius: 0.6,
            line_width: 0.05,
            factor: 0.7,
        },
        LandscapePattern::Lines {
            num_cells: 5,
            line_width: 0.02,
            horizontal: true,
        },
        LandscapePattern::Grid {
            cells: [4, 3],
            skip_pct: 0.4,
            seed: 8,
        },
        LandscapePattern::Triangles {
            num_cells: 6,
            flip: 0.0,
            seed: 2,
        },
        LandscapePattern::GridCircles {
            num_cells: 6,
            radius: 0.03,
            jitter: 0.01,
            seed: 1,
        },
        LandscapePattern::SinWaves {
            num_cells: 4,
            line_width: 0.02,
            horizontal: false,
            frequency: 2.0,
            amplitude: 0.05,
        },
        LandscapePattern::Steps {
            num_cells: 5,
            line_width: 0.01,
            flip_x: false,
        },
    ];

    for pattern in patterns {
        let config = base_config(48, 32)
            .with_border(true)
            .with_landscape(pattern.clone())
            .with_layer(stacked(1, 1.0, 1.0));
        let sim = Physarum::new(Arc::clone(&ctx), &config, Diagnostics::disabled()).unwrap();
        let field = sim.read_landscape().unwrap();
        assert_eq!(field.len(), 48 * 32);
        assert!(
            field.iter().all(|v| (0.0..=1.0).contains(v)),
            "{} left the unit range",
            pattern.kind()
        );
        // Every value sits on the output grid.
        assert!(field.iter().all(|v| (v * 1024.0).fract() == 0.0));
        // The border raises the corner texel towards 1.
        assert!(field[0] > 0.5);
    }
}

#[test]
fn test_too_many_layers_rejected() {
    let Some(ctx) = gpu() else { return };

    let mut config = base_config(16, 16);
    for _ in 0..4 {
        config = config.with_layer(stacked(1, 1.0, 1.0));
    }
    let result = Physarum::new(ctx, &config, Diagnostics::disabled());
    assert!(matches!(result, Err(PhysarumError::TooManyLayers(4))));
}
