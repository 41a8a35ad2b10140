use bloodflow::io::trajectory::TrajectoryRecorder;
use bloodflow::simulation::{Simulation, SimulationSettings, SimulationState};
use bloodflow::space::Field;
use bloodflow::vessel::VesselParameters;
use bloodflow::waveform::InletWaveform;
use matrixcompare::assert_scalar_eq;
use std::f64::consts::PI;

fn settings(num_elements: usize, num_time_steps: usize) -> SimulationSettings {
    SimulationSettings {
        num_elements,
        num_time_steps,
        ..SimulationSettings::default()
    }
}

fn constant_waveform(flow: f64) -> InletWaveform {
    InletWaveform::from_samples(vec![0.0, 1.0], vec![flow, flow]).unwrap()
}

fn pulse_waveform() -> InletWaveform {
    InletWaveform::from_samples(vec![0.0, 0.25, 0.5, 1.0], vec![5.0, 9.0, 4.0, 5.0]).unwrap()
}

#[test]
fn default_settings() {
    let settings = SimulationSettings::default();
    assert_eq!(settings.num_elements, 100);
    assert_eq!(settings.num_time_steps, 100);
    assert_eq!(settings.quadrature_points, 4);
    assert_eq!(settings.area_regularization, 1e-16);
    assert_eq!(settings.newton.max_iterations, Some(50));
    assert!(!settings.line_search);
    assert!(settings.validate().is_ok());
}

#[test]
fn settings_deserialize_with_defaults() {
    let settings: SimulationSettings =
        serde_json::from_str(r#"{ "num_elements": 20, "boundary_policy": { "pin_outlet_flow": true } }"#).unwrap();
    assert_eq!(settings.num_elements, 20);
    assert_eq!(settings.num_time_steps, 100);
    assert!(settings.boundary_policy.pin_outlet_flow);
    assert!(!settings.boundary_policy.pin_inlet_area);
}

#[test]
fn invalid_settings_are_rejected() {
    let waveform = constant_waveform(5.0);
    let params = VesselParameters::default();
    for invalid in [
        settings(0, 10),
        settings(10, 1),
        SimulationSettings {
            quadrature_points: 0,
            ..settings(10, 10)
        },
        SimulationSettings {
            area_regularization: -1.0,
            ..settings(10, 10)
        },
    ] {
        assert!(invalid.validate().is_err());
        assert!(Simulation::<f64>::new(&params, invalid, &waveform).is_err());
    }
}

#[test]
fn initial_state() {
    let params = VesselParameters::default();
    let sim = Simulation::<f64>::new(&params, settings(10, 5), &pulse_waveform()).unwrap();

    assert_eq!(sim.state(), SimulationState::Initial);
    assert_eq!(sim.step_index(), 0);
    assert_eq!(sim.time(), 0.0);
    assert_eq!(sim.final_time(), 1.0);
    assert_scalar_eq!(sim.time_step(), 0.25, comp = abs, tol = 1e-15);
    assert_eq!(sim.sample_times(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(sim.inlet_flows()[0..3], [5.0, 9.0, 4.0]);

    let area = sim.space().field_values(sim.solution(), Field::Area);
    let flow = sim.space().field_values(sim.solution(), Field::Flow);
    assert_eq!(area.len(), 11);
    for a in area {
        assert_scalar_eq!(a, PI * 0.37 * 0.37, comp = abs, tol = 1e-14);
    }
    assert!(flow.iter().all(|&q| q == 5.0));
    assert_eq!(sim.previous(), sim.solution());

    let history = sim.flow_history();
    assert_eq!(history.num_positions(), 10);
    assert_eq!(history.num_samples(), 5);
    assert!(history.flow.column(0).iter().all(|&q| (q - 5.0).abs() <= 1e-12));
}

#[test]
fn run_produces_one_frame_per_sample() {
    let params = VesselParameters::default();
    let mut sim = Simulation::<f64>::new(&params, settings(8, 6), &pulse_waveform()).unwrap();
    let mut recorder = TrajectoryRecorder::new();
    sim.run(&mut recorder).unwrap();

    assert!(recorder.is_finished());
    assert_eq!(recorder.frames().len(), 6);
    for (n, frame) in recorder.frames().iter().enumerate() {
        assert_eq!(frame.step, n);
        assert_eq!(frame.time, sim.sample_times()[n]);
        assert_eq!(frame.area.len(), 9);
        assert_eq!(frame.flow.len(), 9);
    }
    assert_eq!(recorder.frames()[5].time, 1.0);
    assert_eq!(sim.state(), SimulationState::Done);
    assert_eq!(sim.step_index(), 5);
}

#[test]
fn stepping_after_final_time_is_an_error() {
    let params = VesselParameters::default();
    let mut sim = Simulation::<f64>::new(&params, settings(4, 3), &pulse_waveform()).unwrap();
    sim.step().unwrap();
    assert_eq!(sim.state(), SimulationState::Stepping);
    sim.step().unwrap();
    assert_eq!(sim.state(), SimulationState::Done);

    let solution = sim.solution().clone();
    assert!(sim.step().is_err());
    assert_eq!(sim.solution(), &solution);
    assert_eq!(sim.step_index(), 2);
}

#[test]
fn inlet_flow_follows_prescribed_samples() {
    let params = VesselParameters::default();
    let mut sim = Simulation::<f64>::new(&params, settings(10, 9), &pulse_waveform()).unwrap();
    while sim.state() != SimulationState::Done {
        let frame = sim.step().unwrap();
        let n = frame.step;
        assert_scalar_eq!(frame.flow[0], sim.inlet_flows()[n], comp = abs, tol = 1e-12);
        assert_scalar_eq!(sim.flow_history().flow[(0, n)], sim.inlet_flows()[n], comp = abs, tol = 1e-12);
        assert!(frame.area.iter().all(|a| a.is_finite() && *a > 0.0));
        assert!(frame.flow.iter().all(|q| q.is_finite()));
    }
}

#[test]
fn constant_inflow_through_uniform_vessel_stays_constant() {
    let params = VesselParameters::default();
    let mut sim = Simulation::<f64>::new(&params, settings(20, 11), &constant_waveform(5.0)).unwrap();
    for _ in 0..5 {
        let frame = sim.step().unwrap();
        for &q in &frame.flow {
            assert!((q - 5.0).abs() <= 0.05, "flow {} deviates from constant inflow", q);
        }
        let reference_area = PI * 0.37 * 0.37;
        for &a in &frame.area {
            assert!((a - reference_area).abs() <= 1e-3 * reference_area);
        }
    }
}

#[test]
fn newton_failure_reports_step_and_keeps_state() {
    let params = VesselParameters::default();
    let mut settings = settings(6, 5);
    settings.newton.max_iterations = Some(0);
    let mut sim = Simulation::<f64>::new(&params, settings, &pulse_waveform()).unwrap();

    let err = sim.step().unwrap_err();
    assert!(err.to_string().contains("step 1"), "{:?}", err);
    assert_eq!(sim.state(), SimulationState::Initial);
    assert_eq!(sim.step_index(), 0);
    assert_eq!(sim.previous(), sim.solution());
}

#[test]
fn line_search_gives_same_solution() {
    let params = VesselParameters::default();
    let mut plain = Simulation::<f64>::new(&params, settings(10, 9), &pulse_waveform()).unwrap();
    let mut with_line_search = Simulation::<f64>::new(
        &params,
        SimulationSettings {
            line_search: true,
            ..settings(10, 9)
        },
        &pulse_waveform(),
    )
    .unwrap();

    plain.run(TrajectoryRecorder::new()).unwrap();
    with_line_search.run(TrajectoryRecorder::new()).unwrap();

    let difference = (plain.solution() - with_line_search.solution()).amax();
    assert!(difference <= 1e-6, "solutions differ by {}", difference);
}

#[test]
fn flow_history_serializes_to_json() {
    let params = VesselParameters::default();
    let mut sim = Simulation::<f64>::new(&params, settings(4, 3), &constant_waveform(5.0)).unwrap();
    sim.run(TrajectoryRecorder::new()).unwrap();
    let json = serde_json::to_value(sim.flow_history()).unwrap();
    assert_eq!(json["positions"].as_array().unwrap().len(), 4);
    assert_eq!(json["times"].as_array().unwrap().len(), 3);
}
