//! Implicit Euler time integration of the flow equations.
use crate::assembly::BloodFlowAssembler;
use crate::boundary::{apply_dirichlet_values, BoundaryPolicy};
use crate::form::BloodFlowForm;
use crate::io::trajectory::{Frame, TrajectorySink};
use crate::mesh::{linspace, IntervalMesh};
use crate::quadrature::GaussRule;
use crate::space::{Field, MixedSpace};
use crate::system::ImplicitEulerSystem;
use crate::vessel::{TaperedVessel, VesselParameters};
use crate::waveform::InletWaveform;
use crate::Real;
use bloodflow_optimize::newton::{newton, newton_line_search, BacktrackingLineSearch, NewtonSettings};
use eyre::{eyre, WrapErr};
use log::{debug, info};
use nalgebra::{DMatrix, DVector, Vector2};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

/// Discretization and solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Number of mesh segments `Nx`. Also the number of flow sample positions.
    pub num_elements: usize,
    /// Number of time samples `Nt`, including the initial condition.
    pub num_time_steps: usize,
    /// Number of Gauss points per element.
    pub quadrature_points: usize,
    pub area_regularization: f64,
    pub boundary_policy: BoundaryPolicy,
    pub newton: NewtonSettings<f64>,
    /// Use a backtracking line search in the Newton iteration.
    pub line_search: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            num_elements: 100,
            num_time_steps: 100,
            quadrature_points: 4,
            area_regularization: 1e-16,
            boundary_policy: BoundaryPolicy::default(),
            newton: NewtonSettings::default(),
            line_search: false,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.num_elements < 1 {
            return Err(eyre!("at least one element is required"));
        }
        if self.num_time_steps < 2 {
            return Err(eyre!(
                "at least two time samples are required, got {}",
                self.num_time_steps
            ));
        }
        if self.quadrature_points < 1 {
            return Err(eyre!("at least one quadrature point is required"));
        }
        if !(self.area_regularization.is_finite() && self.area_regularization >= 0.0) {
            return Err(eyre!(
                "area regularization must be non-negative, got {}",
                self.area_regularization
            ));
        }
        if !(self.newton.tolerance >= 0.0) {
            return Err(eyre!("Newton tolerance must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SimulationState {
    /// At `t = 0`, no step taken yet.
    Initial,
    Stepping,
    /// The final time has been reached.
    Done,
}

/// Flow rate sampled at fixed positions after every time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Real + Serialize", deserialize = "T: Real + Deserialize<'de>"))]
pub struct FlowHistory<T: Real> {
    pub positions: Vec<T>,
    pub times: Vec<T>,
    /// `flow[(i, n)]` is the flow at `positions[i]` and `times[n]`.
    pub flow: DMatrix<T>,
}

impl<T: Real> FlowHistory<T> {
    fn new(positions: Vec<T>, times: Vec<T>) -> Self {
        let flow = DMatrix::zeros(positions.len(), times.len());
        Self { positions, times, flow }
    }

    pub fn num_positions(&self) -> usize {
        self.positions.len()
    }

    pub fn num_samples(&self) -> usize {
        self.times.len()
    }
}

fn to_real<T: Real>(value: f64) -> eyre::Result<T> {
    T::from_f64(value).ok_or_else(|| eyre!("{} cannot be represented in the scalar type", value))
}

/// Pulsatile flow through a single vessel driven by a prescribed inlet flow rate.
#[derive(Debug)]
pub struct Simulation<T: Real> {
    settings: SimulationSettings,
    vessel: TaperedVessel<T>,
    assembler: BloodFlowAssembler<T>,
    jacobian: CsrMatrix<T>,
    sample_times: Vec<T>,
    inlet_flows: Vec<T>,
    time_step: T,
    step_index: usize,
    state: SimulationState,
    solution: DVector<T>,
    residual: DVector<T>,
    increment: DVector<T>,
    flow_history: FlowHistory<T>,
}

impl<T: Real> Simulation<T> {
    /// Sets up the discretization and the initial condition `A = A0(x)`, `q = q_inlet(0)`.
    ///
    /// The last sample time of the waveform is the final time `T`. The inlet flow is sampled at
    /// `num_time_steps` uniformly spaced times in `[0, T]`, so step `n` ends exactly at the `n`-th
    /// sample.
    pub fn new(
        parameters: &VesselParameters,
        settings: SimulationSettings,
        waveform: &InletWaveform,
    ) -> eyre::Result<Self> {
        settings.validate()?;
        let final_time = waveform.end_time();
        let vessel = TaperedVessel::new(parameters, to_real::<T>(final_time)?)
            .wrap_err("invalid vessel configuration")?;

        let nt = settings.num_time_steps;
        let sample_times = linspace(0.0, final_time, nt);
        let inlet_flows = sample_times
            .iter()
            .map(|&t| to_real(waveform.interpolate(t)))
            .collect::<eyre::Result<Vec<T>>>()?;
        let sample_times = sample_times
            .into_iter()
            .map(to_real)
            .collect::<eyre::Result<Vec<T>>>()?;
        let time_step = to_real::<T>(final_time / (nt - 1) as f64)?;

        let mesh = IntervalMesh::uniform(vessel.length(), settings.num_elements);
        let positions = linspace(T::zero(), vessel.length(), settings.num_elements);
        let space = MixedSpace::new(mesh);
        let form = BloodFlowForm {
            time_step,
            area_regularization: to_real(settings.area_regularization)?,
            friction_coefficient: vessel.friction_coefficient(),
        };
        let quadrature = GaussRule::new(settings.quadrature_points);
        let mut assembler = BloodFlowAssembler::new(space, &vessel, form, &quadrature);
        let jacobian = assembler.create_jacobian();

        let initial_flow = inlet_flows[0];
        let solution = assembler
            .space()
            .interpolate(|x| Vector2::new(vessel.reference_area(x), initial_flow));
        assembler.set_previous(&solution)?;

        let n = assembler.space().num_dofs();
        let mut simulation = Self {
            flow_history: FlowHistory::new(positions, sample_times.clone()),
            settings,
            vessel,
            assembler,
            jacobian,
            sample_times,
            inlet_flows,
            time_step,
            step_index: 0,
            state: SimulationState::Initial,
            solution,
            residual: DVector::zeros(n),
            increment: DVector::zeros(n),
        };
        simulation.record_flow_history()?;

        info!(
            "Set up simulation with {} elements, {} dofs, {} time steps of size {}",
            simulation.settings.num_elements,
            n,
            nt - 1,
            simulation.time_step
        );
        Ok(simulation)
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn vessel(&self) -> &TaperedVessel<T> {
        &self.vessel
    }

    pub fn space(&self) -> &MixedSpace<T> {
        self.assembler.space()
    }

    pub fn mesh(&self) -> &IntervalMesh<T> {
        self.assembler.space().mesh()
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Number of steps taken so far.
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn time(&self) -> T {
        self.sample_times[self.step_index]
    }

    pub fn final_time(&self) -> T {
        self.sample_times[self.sample_times.len() - 1]
    }

    pub fn time_step(&self) -> T {
        self.time_step
    }

    /// Times `linspace(0, T, Nt)` at which the solution is computed.
    pub fn sample_times(&self) -> &[T] {
        &self.sample_times
    }

    /// Inlet flow rate at each sample time.
    pub fn inlet_flows(&self) -> &[T] {
        &self.inlet_flows
    }

    /// The current solution `U`.
    pub fn solution(&self) -> &DVector<T> {
        &self.solution
    }

    /// The solution `U_n` at the previous step, which the next step starts from.
    pub fn previous(&self) -> &DVector<T> {
        self.assembler.previous()
    }

    pub fn flow_history(&self) -> &FlowHistory<T> {
        &self.flow_history
    }

    pub fn into_flow_history(self) -> FlowHistory<T> {
        self.flow_history
    }

    /// Snapshot of the current solution.
    pub fn frame(&self) -> Frame<T> {
        let space = self.assembler.space();
        Frame {
            step: self.step_index,
            time: self.time(),
            coordinates: space.mesh().vertices().iter().map(|v| v.x).collect(),
            area: space.field_values(&self.solution, Field::Area),
            flow: space.field_values(&self.solution, Field::Flow),
        }
    }

    fn record_flow_history(&mut self) -> eyre::Result<()> {
        let space = self.assembler.space();
        for (i, &x) in self.flow_history.positions.iter().enumerate() {
            let flow = space
                .evaluate(&self.solution, Field::Flow, x)
                .ok_or_else(|| eyre!("sample position {} is outside the vessel", x))?;
            self.flow_history.flow[(i, self.step_index)] = flow;
        }
        Ok(())
    }

    /// Advances the solution by one time step and returns the new frame.
    ///
    /// # Errors
    ///
    /// Fails if the final time has already been reached, or if the Newton iteration does not
    /// converge. In the latter case the simulation is left at the previous step.
    pub fn step(&mut self) -> eyre::Result<Frame<T>> {
        if self.state == SimulationState::Done {
            return Err(eyre!(
                "simulation has already reached the final time {}",
                self.final_time()
            ));
        }

        let n = self.step_index + 1;
        let time = self.sample_times[n];
        let space = self.assembler.space();
        let conditions = self.settings.boundary_policy.conditions(
            space,
            self.inlet_flows[n],
            self.vessel.reference_area(T::zero()),
            self.vessel.reference_area(self.vessel.length()),
        );

        let mut u = self.assembler.previous().clone();
        apply_dirichlet_values(&mut u, space, &conditions);

        let newton_settings = NewtonSettings {
            max_iterations: self.settings.newton.max_iterations,
            tolerance: to_real(self.settings.newton.tolerance)?,
            relative_tolerance: self
                .settings
                .newton
                .relative_tolerance
                .map(to_real)
                .transpose()?,
        };
        let system = ImplicitEulerSystem::new(&self.assembler, &conditions, &mut self.jacobian);
        let result = if self.settings.line_search {
            newton_line_search(
                system,
                &mut u,
                &mut self.residual,
                &mut self.increment,
                newton_settings,
                &mut BacktrackingLineSearch::default(),
            )
        } else {
            newton(system, &mut u, &mut self.residual, &mut self.increment, newton_settings)
        };
        let result = result.wrap_err_with(|| format!("Newton solve failed at step {} (t = {})", n, time))?;
        debug!(
            "Newton converged in {} iterations with residual norm {}",
            result.iterations, result.residual_norm
        );

        self.assembler.set_previous(&u)?;
        self.solution = u;
        self.step_index = n;
        self.state = if n + 1 == self.sample_times.len() {
            SimulationState::Done
        } else {
            SimulationState::Stepping
        };
        self.record_flow_history()?;

        info!(
            "Step {}/{}: t = {}, inlet flow = {}, Newton iterations = {}",
            n,
            self.sample_times.len() - 1,
            time,
            self.inlet_flows[n],
            result.iterations
        );
        Ok(self.frame())
    }

    /// Steps until the final time, passing every frame to `sink`.
    ///
    /// When started from the initial state, the initial condition is written first, so the sink
    /// receives exactly `num_time_steps` frames.
    pub fn run(&mut self, mut sink: impl TrajectorySink<T>) -> eyre::Result<()> {
        if self.state == SimulationState::Initial {
            sink.write_frame(&self.frame())?;
        }
        while self.state != SimulationState::Done {
            let frame = self.step()?;
            sink.write_frame(&frame)?;
        }
        sink.finish()
    }
}
