//! Filtering MISO Node - multi-input fusion with staleness rejection
//!
//! Collects inputs until triggered, rejects inputs that are too old relative
//! to the freshest one, fuses the rest into a single message and then stays
//! busy for a sampled task duration before emitting the result.

use std::any::Any;

use compsim_core::time::round_div_half_even;
use compsim_core::{
    as_age, DrawOptions, DurationSampler, Header, Message, Node, NodeId, NodeVisitor,
    NormalizerSet, Outbox, SimResult, Time, TimeProvider,
};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Task lifecycle of a compute node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Idle,
    Busy,
}

/// Fan-in compute node
pub struct FilteringMisoNode<D = Box<dyn DurationSampler>>
where
    D: DurationSampler,
{
    id: NodeId,
    time: TimeProvider,
    duration_sampler: D,
    filter_threshold: Option<Time>,
    normalizers: NormalizerSet,
    output_pass: Option<NodeId>,
    output_fail: Option<NodeId>,
    trigger_on_receive: bool,

    // Task state
    pending: Vec<Message>,
    state: ProcessingState,
    t_created: Time,
    t_start: Time,
    t_stop: Time,
    result: Option<Message>,
    input_count: u64,
    total_measurement_count: u64,
}

impl<D: DurationSampler> FilteringMisoNode<D> {
    /// Create an idle node that accepts inputs of any age
    pub fn new(id: impl Into<NodeId>, time: TimeProvider, duration_sampler: D) -> Self {
        let now = time.time();
        Self {
            id: id.into(),
            time,
            duration_sampler,
            filter_threshold: None,
            normalizers: NormalizerSet::default(),
            output_pass: None,
            output_fail: None,
            trigger_on_receive: false,
            pending: Vec::new(),
            state: ProcessingState::Idle,
            t_created: now,
            t_start: now,
            t_stop: now,
            result: None,
            input_count: 0,
            total_measurement_count: 0,
        }
    }

    pub fn with_filter_threshold(mut self, threshold: Time) -> Self {
        self.filter_threshold = Some(threshold);
        self
    }

    pub fn with_normalizers(mut self, normalizers: NormalizerSet) -> Self {
        self.normalizers = normalizers;
        self
    }

    /// Run [`Node::trigger`] whenever an input arrives
    pub fn with_trigger_on_receive(mut self, enabled: bool) -> Self {
        self.trigger_on_receive = enabled;
        self
    }

    /// `None` accepts inputs of any age
    pub fn set_filter_threshold(&mut self, threshold: Option<Time>) {
        self.filter_threshold = threshold;
    }

    pub fn filter_threshold(&self) -> Option<Time> {
        self.filter_threshold
    }

    pub fn set_output_pass(&mut self, output: impl Into<NodeId>) {
        self.output_pass = Some(output.into());
    }

    pub fn set_output_fail(&mut self, output: impl Into<NodeId>) {
        self.output_fail = Some(output.into());
    }

    pub fn set_trigger_on_receive(&mut self, enabled: bool) {
        self.trigger_on_receive = enabled;
    }

    pub fn processing_state(&self) -> ProcessingState {
        self.state
    }

    /// Number of inputs accepted by the last trigger
    pub fn last_input_count(&self) -> u64 {
        self.input_count
    }

    /// Measurements fused by the last trigger
    pub fn last_measurement_count(&self) -> u64 {
        self.total_measurement_count
    }

    /// Inputs received since the last trigger
    pub fn pending_inputs(&self) -> &[Message] {
        &self.pending
    }

    /// Time at which the running task completes
    pub fn completion_time(&self) -> Option<Time> {
        match self.state {
            ProcessingState::Busy => Some(self.t_stop),
            ProcessingState::Idle => None,
        }
    }

    pub fn duration_sampler_mut(&mut self) -> &mut D {
        &mut self.duration_sampler
    }

    /// Split off stale inputs, routing them to the fail output if there is one
    fn filter_inputs(&self, inputs: Vec<Message>, outbox: &mut Outbox) -> Vec<Message> {
        let Some(youngest) = inputs.iter().map(|m| m.header.t_measure_youngest).max() else {
            return inputs;
        };

        let mut accepted = Vec::with_capacity(inputs.len());
        for input in inputs {
            let stale = self.filter_threshold.is_some_and(|threshold| {
                input.header.t_measure_oldest.saturating_add(threshold) < youngest
            });
            if !stale {
                accepted.push(input);
                continue;
            }
            match &self.output_fail {
                Some(fail) => {
                    trace!("Node '{}' rejected stale input, routing to '{}'", self.id, fail);
                    outbox.send(fail.clone(), input);
                }
                None => trace!("Node '{}' rejected stale input", self.id),
            }
        }
        accepted
    }

    fn start_task(&mut self) {
        let now = self.time.time();
        let duration = self.duration_sampler.sample();
        self.t_start = now;
        self.t_stop = now + duration;
        self.state = ProcessingState::Busy;
        debug!(
            "Node '{}' started task at {}, done at {}",
            self.id, self.t_start, self.t_stop
        );
    }
}

/// Combine accepted inputs into one message
///
/// Oldest and youngest stamps are the extremes of the inputs, the average is
/// weighted by each input's measurement count and rounded half-to-even.
pub fn fuse(inputs: &[Message]) -> Option<Header> {
    let first = inputs.first()?;
    let mut oldest = first.header.t_measure_oldest;
    let mut youngest = first.header.t_measure_youngest;
    let mut count: u64 = 0;
    let mut weighted_sum: i128 = 0;
    for input in inputs {
        let header = &input.header;
        oldest = oldest.min(header.t_measure_oldest);
        youngest = youngest.max(header.t_measure_youngest);
        count += header.num_measurements;
        weighted_sum += i128::from(header.num_measurements) * i128::from(header.t_measure_average);
    }
    let average = if count == 0 {
        youngest
    } else {
        round_div_half_even(weighted_sum, i128::from(count))
    };
    Some(Header::new(oldest, youngest, average).with_measurements(count))
}

impl<D: DurationSampler + 'static> Node for FilteringMisoNode<D> {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn outputs(&self) -> Vec<NodeId> {
        self.output_pass
            .iter()
            .chain(self.output_fail.iter())
            .cloned()
            .collect()
    }

    fn receive(&mut self, message: Message, outbox: &mut Outbox) -> SimResult<()> {
        self.pending.push(message);
        if self.trigger_on_receive {
            self.trigger(outbox)?;
        }
        Ok(())
    }

    fn generate_state(&self) -> Vec<f32> {
        let busy = if self.is_busy() { 1.0 } else { 0.0 };
        vec![
            self.normalizers.occupancy(busy),
            self.normalizers.age(as_age(self.t_start, self.time.time())),
            self.normalizers.count(self.input_count),
            self.normalizers.count(self.total_measurement_count),
        ]
    }

    fn update(&mut self, outbox: &mut Outbox) -> SimResult<()> {
        if self.state == ProcessingState::Idle || self.time.time() < self.t_stop {
            return Ok(());
        }

        if let (Some(pass), Some(result)) = (&self.output_pass, self.result.take()) {
            outbox.send(pass.clone(), result.addressed(&self.id, pass));
        }
        self.state = ProcessingState::Idle;
        debug!("Node '{}' finished task at {}", self.id, self.time.time());
        Ok(())
    }

    fn trigger(&mut self, outbox: &mut Outbox) -> SimResult<()> {
        if self.is_busy() {
            return Ok(());
        }

        let inputs = std::mem::take(&mut self.pending);
        let accepted = self.filter_inputs(inputs, outbox);
        self.input_count = accepted.len() as u64;
        self.total_measurement_count = accepted.iter().map(|m| m.header.num_measurements).sum();
        self.result = fuse(&accepted).map(Message::new);
        if self.result.is_some() {
            self.start_task();
        }
        Ok(())
    }

    /// Return to the construction-time state. Task stamps go back to the
    /// construction time, so the state stays readable before the clock itself
    /// is reset.
    fn reset(&mut self) {
        self.pending.clear();
        self.state = ProcessingState::Idle;
        self.t_start = self.t_created;
        self.t_stop = self.t_created;
        self.result = None;
        self.input_count = 0;
        self.total_measurement_count = 0;
    }

    fn visit(&self, visitor: &mut dyn NodeVisitor) {
        visitor.visit_node(self);
    }

    fn draw_options(&self) -> DrawOptions {
        let state = self.generate_state();
        DrawOptions {
            color: if self.is_busy() { "darkred" } else { "darkgreen" }.to_string(),
            shape: "square".to_string(),
            hover_text: format!("is_busy = {}<br>t_start_age = {}", self.is_busy(), state[1]),
        }
    }

    fn is_busy(&self) -> bool {
        self.state == ProcessingState::Busy
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
