// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Distributed camera surveillance scenario.
//!
//! A cloud datacentre sits above a proxy server, which fans out to one
//! router per surveillance area. Each area holds a set of smart cameras,
//! every camera carrying a video sensor and a PTZ actuator. The
//! application detects motion on the cameras, detects and tracks objects
//! on the area routers, and renders a user interface in the cloud. The
//! object tracker periodically steers the PTZ actuators of its area.
//!
//! Run with console logging:
//! ```
//!   ./target/debug/surveillance --stdout --stdout-level debug
//! ```

use std::io::BufWriter;
use std::sync::Arc;
use std::{io, process};

use clap::Parser;
use fogsim_components::distribution::Deterministic;
use fogsim_components::power::LinearPowerModel;
use fogsim_engine::config::SimConfig;
use fogsim_engine::engine::Engine;
use fogsim_engine::types::{EntityId, SimError};
use fogsim_models::actuator::Actuator;
use fogsim_models::application::{AppEdge, AppEdgeType, AppLoop, Application};
use fogsim_models::controller::{Controller, ModuleMapping};
use fogsim_models::device::{DeviceParams, FogDevice};
use fogsim_models::events::FogEvent;
use fogsim_models::monitor::NetworkMonitor;
use fogsim_models::sensor::Sensor;
use fogsim_models::timekeeper::{LatencyRegistry, LoopId};
use fogsim_track::tracker::{EntityManager, TextTracker, Tracker, dev_null_tracker};

/// Command-line arguments.
#[derive(Parser)]
#[command(about = "Distributed camera surveillance simulation")]
struct Cli {
    /// Enable logging to the console.
    #[arg(long, default_value = "false")]
    stdout: bool,

    /// Level of log message to display.
    #[arg(long, default_value = "Info")]
    stdout_level: log::Level,

    /// Set a regular expression for which entities should have logging
    /// level set to `--stdout-level`. Others will have level set to
    /// `Error`.
    #[arg(long, default_value = "")]
    stdout_filter_regex: String,

    /// Number of surveillance areas, one router each.
    #[arg(long, default_value = "2")]
    areas: usize,

    /// Number of smart cameras per area.
    #[arg(long, default_value = "4")]
    cameras_per_area: usize,

    /// Interval between camera frames in simulated milliseconds.
    #[arg(long, default_value = "2500.0")]
    transmit_interval_ms: f64,

    /// Simulated time to run for, in milliseconds.
    #[arg(long, default_value = "60000.0")]
    duration_ms: f64,
}

const APP_ID: &str = "dcns";

/// The surveillance application graph, with the loops to monitor.
fn build_application(registry: &LatencyRegistry) -> (Application, LoopId, LoopId) {
    let mut app = Application::new(APP_ID);
    app.add_module("motion_detector");
    app.add_module("object_detector");
    app.add_module("object_tracker");
    app.add_module("user_interface");

    app.add_edge(AppEdge {
        source: String::from("CAMERA"),
        dest: String::from("motion_detector"),
        periodicity_ms: None,
        cpu_length_mi: 1000.0,
        size_bytes: 20000,
        tuple_type: String::from("CAMERA"),
        direction: fogsim_models::tuple::Direction::Up,
        edge_type: AppEdgeType::Sensor,
    });
    app.add_edge(AppEdge {
        source: String::from("motion_detector"),
        dest: String::from("object_detector"),
        periodicity_ms: None,
        cpu_length_mi: 2000.0,
        size_bytes: 2000,
        tuple_type: String::from("MOTION_VIDEO_STREAM"),
        direction: fogsim_models::tuple::Direction::Up,
        edge_type: AppEdgeType::Module,
    });
    app.add_edge(AppEdge {
        source: String::from("object_detector"),
        dest: String::from("user_interface"),
        periodicity_ms: None,
        cpu_length_mi: 500.0,
        size_bytes: 2000,
        tuple_type: String::from("DETECTED_OBJECT"),
        direction: fogsim_models::tuple::Direction::Up,
        edge_type: AppEdgeType::Module,
    });
    app.add_edge(AppEdge {
        source: String::from("object_detector"),
        dest: String::from("object_tracker"),
        periodicity_ms: None,
        cpu_length_mi: 1000.0,
        size_bytes: 100,
        tuple_type: String::from("OBJECT_LOCATION"),
        direction: fogsim_models::tuple::Direction::Up,
        edge_type: AppEdgeType::Module,
    });
    app.add_edge(AppEdge {
        source: String::from("object_tracker"),
        dest: String::from("PTZ_CONTROL"),
        periodicity_ms: Some(100.0),
        cpu_length_mi: 100.0,
        size_bytes: 28,
        tuple_type: String::from("PTZ_PARAMS"),
        direction: fogsim_models::tuple::Direction::Down,
        edge_type: AppEdgeType::Actuator,
    });

    // One output frame stream per motion event, one object location per
    // stream, and one detected object per twenty streams.
    app.add_selectivity("motion_detector", "CAMERA", "MOTION_VIDEO_STREAM", 1.0);
    app.add_selectivity("object_detector", "MOTION_VIDEO_STREAM", "OBJECT_LOCATION", 1.0);
    app.add_selectivity("object_detector", "MOTION_VIDEO_STREAM", "DETECTED_OBJECT", 0.05);

    let tracking_loop = registry.new_loop_id();
    app.add_loop(AppLoop::new(
        tracking_loop,
        vec![
            String::from("motion_detector"),
            String::from("object_detector"),
            String::from("object_tracker"),
        ],
    ));
    let control_loop = registry.new_loop_id();
    app.add_loop(AppLoop::new(
        control_loop,
        vec![String::from("object_tracker"), String::from("PTZ_CONTROL")],
    ));
    (app, tracking_loop, control_loop)
}

fn build_tracker(cli: &Cli) -> Tracker {
    if !cli.stdout {
        return dev_null_tracker();
    }
    let mut entity_manager = EntityManager::new(cli.stdout_level);
    if !cli.stdout_filter_regex.is_empty() {
        entity_manager.add_log_filter(&cli.stdout_filter_regex, cli.stdout_level);
        entity_manager.add_log_filter(".*", log::Level::Error);
    }
    let writer = Box::new(BufWriter::new(io::stdout()));
    Arc::new(TextTracker::new(entity_manager, writer))
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let tracker = build_tracker(cli);
    let config = SimConfig::load()?;
    let mut engine: Engine<FogEvent> = Engine::with_config(&tracker, config);
    let registry = LatencyRegistry::new();
    let monitor = NetworkMonitor::new();

    let (app, tracking_loop, control_loop) = build_application(&registry);

    let power_server = || Box::new(LinearPowerModel::new(107.339, 83.4333));
    let power_camera = || Box::new(LinearPowerModel::new(87.53, 82.44));

    let mut cloud = FogDevice::new(
        engine.top(),
        "cloud",
        DeviceParams {
            mips: 44800.0,
            uplink_bw: 100.0,
            downlink_bw: 10000.0,
            rate_per_mips: 0.01,
        },
        Box::new(LinearPowerModel::new(16.0 * 103.0, 16.0 * 83.25)),
        registry.clone(),
        monitor.clone(),
    )?;
    let mut proxy = FogDevice::new(
        engine.top(),
        "proxy-server",
        DeviceParams {
            mips: 2800.0,
            uplink_bw: 10000.0,
            downlink_bw: 10000.0,
            rate_per_mips: 0.0,
        },
        power_server(),
        registry.clone(),
        monitor.clone(),
    )?;

    // Ids are assigned densely in registration order; plan them up front
    // so parent and child links can be wired before registration.
    let mut planned = 0usize;
    let mut next_id = || {
        let id = EntityId(planned);
        planned += 1;
        id
    };
    let cloud_id = next_id();
    let proxy_id = next_id();

    struct Area {
        router: FogDevice,
        router_id: EntityId,
        cameras: Vec<(FogDevice, EntityId, Sensor, EntityId, Actuator, EntityId)>,
    }

    let mut mapping = ModuleMapping::new();
    mapping.map(cloud_id, "user_interface");

    let mut areas = Vec::with_capacity(cli.areas);
    for a in 0..cli.areas {
        let mut router = FogDevice::new(
            engine.top(),
            &format!("router{a}"),
            DeviceParams {
                mips: 2800.0,
                uplink_bw: 10000.0,
                downlink_bw: 10000.0,
                rate_per_mips: 0.0,
            },
            power_server(),
            registry.clone(),
            monitor.clone(),
        )?;
        let router_id = next_id();
        router.set_parent(proxy_id, 2.0);
        proxy.add_child(router_id, 2.0);
        mapping.map(router_id, "object_detector");
        mapping.map(router_id, "object_tracker");

        let mut cameras = Vec::with_capacity(cli.cameras_per_area);
        for c in 0..cli.cameras_per_area {
            let mut camera = FogDevice::new(
                engine.top(),
                &format!("camera{a}-{c}"),
                DeviceParams {
                    mips: 500.0,
                    uplink_bw: 10000.0,
                    downlink_bw: 10000.0,
                    rate_per_mips: 0.0,
                },
                power_camera(),
                registry.clone(),
                monitor.clone(),
            )?;
            let camera_id = next_id();
            camera.set_parent(router_id, 2.0);
            router.add_child(camera_id, 2.0);
            mapping.map(camera_id, "motion_detector");

            let sensor = Sensor::new(
                engine.top(),
                &format!("sensor{a}-{c}"),
                camera_id,
                1.0,
                APP_ID,
                "CAMERA",
                Box::new(Deterministic::new(cli.transmit_interval_ms)),
                registry.clone(),
            );
            let sensor_id = next_id();
            let actuator = Actuator::new(
                engine.top(),
                &format!("ptz{a}-{c}"),
                camera_id,
                1.0,
                APP_ID,
                "PTZ_CONTROL",
                registry.clone(),
            );
            let actuator_id = next_id();
            cameras.push((camera, camera_id, sensor, sensor_id, actuator, actuator_id));
        }
        areas.push(Area {
            router,
            router_id,
            cameras,
        });
    }
    let controller_id = next_id();
    cloud.set_controller(controller_id);

    let mut device_ids = vec![cloud_id, proxy_id];
    let mut sensor_ids = Vec::new();
    let mut actuator_ids = Vec::new();

    for area in &areas {
        device_ids.push(area.router_id);
        for (_, camera_id, _, sensor_id, _, actuator_id) in &area.cameras {
            device_ids.push(*camera_id);
            sensor_ids.push(*sensor_id);
            actuator_ids.push(*actuator_id);
        }
    }
    // The proxy is the single child of the cloud.
    proxy.set_parent(cloud_id, 100.0);
    cloud.add_child(proxy_id, 100.0);

    let mut controller = Controller::new(
        engine.top(),
        "controller",
        device_ids.clone(),
        sensor_ids,
        actuator_ids,
    );
    controller.submit_application(app, mapping);

    // Registration order must match the planned ids above.
    assert_eq!(engine.add_entity(Box::new(cloud)), cloud_id);
    assert_eq!(engine.add_entity(Box::new(proxy)), proxy_id);
    for area in areas {
        assert_eq!(engine.add_entity(Box::new(area.router)), area.router_id);
        for (camera, camera_id, sensor, sensor_id, actuator, actuator_id) in area.cameras {
            assert_eq!(engine.add_entity(Box::new(camera)), camera_id);
            assert_eq!(engine.add_entity(Box::new(sensor)), sensor_id);
            assert_eq!(engine.add_entity(Box::new(actuator)), actuator_id);
        }
    }
    assert_eq!(engine.add_entity(Box::new(controller)), controller_id);

    engine.run_until(cli.duration_ms)?;

    println!("========== RESULTS ==========");
    println!("simulated time       : {:.1} ms", engine.time_now_ms());
    match registry.loop_average(tracking_loop) {
        Some(avg) => println!(
            "tracking loop        : {avg:.2} ms over {} samples",
            registry.sample_count(tracking_loop)
        ),
        None => println!("tracking loop        : no samples"),
    }
    match registry.loop_average(control_loop) {
        Some(avg) => println!(
            "PTZ control loop     : {avg:.2} ms over {} samples",
            registry.sample_count(control_loop)
        ),
        None => println!("PTZ control loop     : no samples"),
    }
    for tuple_type in ["CAMERA", "MOTION_VIDEO_STREAM", "OBJECT_LOCATION", "DETECTED_OBJECT"] {
        if let Some(avg) = registry.execution_average(tuple_type) {
            println!("exec {tuple_type:<16}: {avg:.2} ms");
        }
    }
    for id in &device_ids {
        let device: &FogDevice = engine
            .entity_ref(*id)
            .ok_or(SimError(String::from("missing device")))?;
        println!(
            "device {id} energy     : {:.1} Ws, cost {:.2}",
            device.energy_ws(),
            device.total_cost()
        );
    }
    println!("network usage        : {:.1}", monitor.total_usage());

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("{e}");
        process::exit(1);
    }
}
