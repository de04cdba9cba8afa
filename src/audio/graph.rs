//! Node arena, connections and block rendering.

use std::collections::BTreeMap;

use super::nodes::{BiquadFilter, BlockClock, BufferSource, Gain, Node, NodeType, Oscillator};
use super::analyser::AnalysisTap;
use crate::error::{AudioError, AudioResult};
use crate::params::audio_constants::RENDER_QUANTUM;

/// Handle on a node inside one [`AudioGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

struct NodeSlot {
    node: Node,
    inputs: Vec<NodeId>,
    output: [f32; RENDER_QUANTUM],
}

/// Directed acyclic graph of audio nodes rendered in 128-frame quanta
pub struct AudioGraph {
    sample_rate: f32,
    nodes: Vec<NodeSlot>,
    /// Processing order (topological)
    order: Vec<usize>,
    frames_rendered: u64,
    /// Frames of the last quantum not yet handed out by `render`
    pending: usize,
}

impl AudioGraph {
    /// Create an empty graph holding only the destination node
    pub fn new(sample_rate: f32) -> Self {
        let mut graph = Self {
            sample_rate,
            nodes: Vec::new(),
            order: Vec::new(),
            frames_rendered: 0,
            pending: 0,
        };
        graph.add(Node::Destination);
        graph
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn destination(&self) -> NodeId {
        NodeId(0)
    }

    /// Context time: frames rendered so far divided by the sample rate (seconds)
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, node: impl Into<Node>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeSlot {
            node: node.into(),
            inputs: Vec::new(),
            output: [0.0; RENDER_QUANTUM],
        });
        self.order.push(id.0);
        id
    }

    fn slot(&self, id: NodeId) -> AudioResult<&NodeSlot> {
        self.nodes.get(id.0).ok_or(AudioError::UnknownNode(id.0))
    }

    pub fn node(&self, id: NodeId) -> AudioResult<&Node> {
        Ok(&self.slot(id)?.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> AudioResult<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .map(|slot| &mut slot.node)
            .ok_or(AudioError::UnknownNode(id.0))
    }

    pub fn inputs(&self, id: NodeId) -> AudioResult<&[NodeId]> {
        Ok(&self.slot(id)?.inputs)
    }

    /// Route the output of `from` into `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> AudioResult<()> {
        self.slot(from)?;
        self.slot(to)?;
        let reject = |reason| AudioError::InvalidConnection {
            from: from.0,
            to: to.0,
            reason,
        };

        if from == self.destination() {
            return Err(reject("destination has no output"));
        }
        if self.reaches(to, from) {
            return Err(reject("connection would create a cycle"));
        }
        if self.nodes[to.0].inputs.contains(&from) {
            return Ok(());
        }

        self.nodes[to.0].inputs.push(from);
        self.order = self.topological_order();
        Ok(())
    }

    /// Remove every connection leaving `from`
    pub fn disconnect(&mut self, from: NodeId) -> AudioResult<()> {
        self.slot(from)?;
        for slot in &mut self.nodes {
            slot.inputs.retain(|&input| input != from);
        }
        self.order = self.topological_order();
        Ok(())
    }

    /// Whether `target` is reachable downstream of `start`
    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            stack.extend(
                self.nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.inputs.contains(&id))
                    .map(|(index, _)| NodeId(index)),
            );
        }
        false
    }

    /// Kahn's algorithm over input edges
    fn topological_order(&self) -> Vec<usize> {
        let mut pending: Vec<usize> = self.nodes.iter().map(|slot| slot.inputs.len()).collect();
        let mut ready: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| pending[i] == 0)
            .rev()
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(index) = ready.pop() {
            order.push(index);
            for (consumer, slot) in self.nodes.iter().enumerate() {
                let edges = slot.inputs.iter().filter(|input| input.0 == index).count();
                if edges > 0 {
                    pending[consumer] -= edges;
                    if pending[consumer] == 0 {
                        ready.push(consumer);
                    }
                }
            }
        }
        order
    }

    /// Count of nodes per type (destination included)
    pub fn census(&self) -> BTreeMap<NodeType, usize> {
        let mut census = BTreeMap::new();
        for slot in &self.nodes {
            *census.entry(slot.node.node_type()).or_insert(0) += 1;
        }
        census
    }

    pub fn count(&self, node_type: NodeType) -> usize {
        self.census().get(&node_type).copied().unwrap_or(0)
    }

    /// Process one render quantum and return the destination's output
    pub fn render_quantum(&mut self) -> &[f32; RENDER_QUANTUM] {
        let clock = BlockClock {
            start_time: self.current_time(),
            sample_rate: self.sample_rate,
        };

        for position in 0..self.order.len() {
            let index = self.order[position];
            let mut input = [0.0f32; RENDER_QUANTUM];
            for source in &self.nodes[index].inputs {
                for (mixed, sample) in input.iter_mut().zip(&self.nodes[source.0].output) {
                    *mixed += sample;
                }
            }
            let slot = &mut self.nodes[index];
            slot.node.process(&input, &mut slot.output, &clock);
        }

        self.frames_rendered += RENDER_QUANTUM as u64;
        &self.nodes[0].output
    }

    /// Fill an interleaved buffer, duplicating the mono mix into every channel
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in data.chunks_mut(channels) {
            if self.pending == 0 {
                self.render_quantum();
                self.pending = RENDER_QUANTUM;
            }
            let sample = self.nodes[0].output[RENDER_QUANTUM - self.pending];
            self.pending -= 1;
            frame.fill(sample);
        }
    }

    /// Render and discard `frames` frames (offline pumping)
    pub fn advance(&mut self, frames: usize) {
        let mut scratch = vec![0.0f32; frames];
        self.render(&mut scratch, 1);
    }
}

macro_rules! typed_access {
    ($get:ident, $get_mut:ident, $variant:ident, $ty:ty) => {
        impl AudioGraph {
            pub fn $get(&self, id: NodeId) -> AudioResult<&$ty> {
                match self.node(id)? {
                    Node::$variant(inner) => Ok(inner),
                    other => Err(AudioError::WrongNodeType {
                        id: id.0,
                        expected: NodeType::$variant.name(),
                        actual: other.node_type().name(),
                    }),
                }
            }

            pub fn $get_mut(&mut self, id: NodeId) -> AudioResult<&mut $ty> {
                match self.node_mut(id)? {
                    Node::$variant(inner) => Ok(inner),
                    other => Err(AudioError::WrongNodeType {
                        id: id.0,
                        expected: NodeType::$variant.name(),
                        actual: other.node_type().name(),
                    }),
                }
            }
        }
    };
}

typed_access!(oscillator, oscillator_mut, Oscillator, Oscillator);
typed_access!(biquad, biquad_mut, BiquadFilter, BiquadFilter);
typed_access!(buffer_source, buffer_source_mut, BufferSource, BufferSource);
typed_access!(gain, gain_mut, Gain, Gain);
typed_access!(analyser, analyser_mut, Analyser, AnalysisTap);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::nodes::{AudioBuffer, OscillatorType};

    const SR: f32 = 44_100.0;

    #[test]
    fn test_new_graph_has_only_destination() {
        let graph = AudioGraph::new(SR);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.count(NodeType::Destination), 1);
        assert_eq!(graph.current_time(), 0.0);
    }

    #[test]
    fn test_rejects_cycles_and_destination_output() {
        let mut graph = AudioGraph::new(SR);
        let a = graph.add(Gain::new(1.0));
        let b = graph.add(Gain::new(1.0));
        graph.connect(a, b).unwrap();

        assert!(matches!(
            graph.connect(b, a),
            Err(AudioError::InvalidConnection { .. })
        ));
        assert!(matches!(
            graph.connect(a, a),
            Err(AudioError::InvalidConnection { .. })
        ));
        let destination = graph.destination();
        assert!(graph.connect(destination, a).is_err());
        assert_eq!(
            graph.connect(a, NodeId(99)),
            Err(AudioError::UnknownNode(99))
        );
    }

    #[test]
    fn test_sources_mix_at_shared_input() {
        let mut graph = AudioGraph::new(SR);
        let one = graph.add(BufferSource::new(AudioBuffer::new(SR, vec![0.25]), true));
        let two = graph.add(BufferSource::new(AudioBuffer::new(SR, vec![0.5]), true));
        let destination = graph.destination();
        graph.connect(one, destination).unwrap();
        graph.connect(two, destination).unwrap();
        graph.buffer_source_mut(one).unwrap().start().unwrap();
        graph.buffer_source_mut(two).unwrap().start().unwrap();

        let out = graph.render_quantum();
        assert!(out.iter().all(|&s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_order_respects_connections_added_late() {
        let mut graph = AudioGraph::new(SR);
        let gain = graph.add(Gain::new(0.5));
        let source = graph.add(BufferSource::new(AudioBuffer::new(SR, vec![1.0]), true));
        let destination = graph.destination();
        graph.connect(gain, destination).unwrap();
        graph.connect(source, gain).unwrap();
        graph.buffer_source_mut(source).unwrap().start().unwrap();

        // The source was added after the gain but must still run first
        let out = graph.render_quantum();
        assert!((out[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_render_interleaves_and_advances_clock() {
        let mut graph = AudioGraph::new(SR);
        let source = graph.add(BufferSource::new(AudioBuffer::new(SR, vec![0.1, 0.2]), true));
        let destination = graph.destination();
        graph.connect(source, destination).unwrap();
        graph.buffer_source_mut(source).unwrap().start().unwrap();

        let mut data = [0.0f32; 6];
        graph.render(&mut data, 2);
        assert_eq!(data, [0.1, 0.1, 0.2, 0.2, 0.1, 0.1]);
        assert_eq!(graph.current_time(), RENDER_QUANTUM as f64 / SR as f64);
    }

    #[test]
    fn test_typed_access_reports_wrong_type() {
        let mut graph = AudioGraph::new(SR);
        let osc = graph.add(Oscillator::new(OscillatorType::Sawtooth, 220.0));
        assert!(graph.oscillator(osc).is_ok());
        assert_eq!(
            graph.gain(osc).err(),
            Some(AudioError::WrongNodeType {
                id: osc.index(),
                expected: "gain",
                actual: "oscillator",
            })
        );
    }

    #[test]
    fn test_disconnect_silences_path() {
        let mut graph = AudioGraph::new(SR);
        let source = graph.add(BufferSource::new(AudioBuffer::new(SR, vec![1.0]), true));
        let destination = graph.destination();
        graph.connect(source, destination).unwrap();
        graph.buffer_source_mut(source).unwrap().start().unwrap();
        graph.disconnect(source).unwrap();

        let out = graph.render_quantum();
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
