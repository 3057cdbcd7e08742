//! The pass graph: assembly, freezing and per-frame execution.
//!
//! Passes are owned by the pipeline and addressed by index. Wiring is stored
//! in the port table as `(pass, slot)` pairs, so the graph is plain data.
//! [`Pipeline::freeze`] computes the execution order once; passes with no
//! dependency between them keep their insertion order.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use scene3d_core::{GraphicsError, Size};
use tracing::{debug, error, trace_span};

use crate::context::GraphicContext;
use crate::error::PipelineError;
use crate::pass::RenderPass;
use crate::port::{read_input, read_output_slot, InData, OutData, PassIo, PassPorts, PortValue};

/// Window-layer notification consumed at the start of the next frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Resized(Size),
}

/// Typed reference to a pass added to a [`Pipeline`].
pub struct PassHandle<P> {
    index: usize,
    _marker: PhantomData<fn() -> P>,
}

impl<P> Clone for PassHandle<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PassHandle<P> {}

impl<P> std::fmt::Debug for PassHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PassHandle({})", self.index)
    }
}

impl<P> PassHandle<P> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// One of this pass's outputs, ready to [`Pipeline::connect`].
    pub fn output<T>(&self, port: OutData<T>) -> OutPort<T> {
        OutPort {
            pass: self.index,
            name: port.name(),
            _marker: PhantomData,
        }
    }

    /// One of this pass's inputs, ready to [`Pipeline::connect`].
    pub fn input<T>(&self, port: InData<T>) -> InPort<T> {
        InPort {
            pass: self.index,
            name: port.name(),
            _marker: PhantomData,
        }
    }
}

/// An output port of a specific pass.
pub struct OutPort<T> {
    pass: usize,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

/// An input port of a specific pass.
pub struct InPort<T> {
    pass: usize,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

macro_rules! impl_port_ref {
    ($ty:ident) => {
        impl<T> Clone for $ty<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $ty<T> {}

        impl<T> std::fmt::Debug for $ty<T> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({}.{})", stringify!($ty), self.pass, self.name)
            }
        }
    };
}

impl_port_ref!(OutPort);
impl_port_ref!(InPort);

/// Result of one executed frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub passes_run: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
pub struct Pipeline {
    passes: Vec<Box<dyn RenderPass>>,
    ports: Vec<PassPorts>,
    order: Option<Vec<usize>>,
    frame: u64,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("passes", &self.pass_names())
            .field("order", &self.order)
            .field("frame", &self.frame)
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.order.is_some()
    }

    /// Number of frames executed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pass_names(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Pass indices in execution order, once frozen.
    pub fn order(&self) -> Option<&[usize]> {
        self.order.as_deref()
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    pub fn add_pass<P: RenderPass>(&mut self, pass: P) -> Result<PassHandle<P>, PipelineError> {
        if self.is_frozen() {
            return Err(PipelineError::PipelineFrozen);
        }
        let ports = PassPorts::new(pass.name().to_owned(), &pass.ports())?;
        let index = self.passes.len();
        self.passes.push(Box::new(pass));
        self.ports.push(ports);
        Ok(PassHandle {
            index,
            _marker: PhantomData,
        })
    }

    /// Wires `from` to `to`. Both ends carry the same `T`, so the types are
    /// checked at compile time.
    pub fn connect<T: PortValue>(
        &mut self,
        from: OutPort<T>,
        to: InPort<T>,
    ) -> Result<(), PipelineError> {
        self.connect_named(from.pass, from.name, to.pass, to.name)
    }

    /// Wires ports by pass index and name, checking types at run time.
    ///
    /// On error the wiring is left unchanged.
    pub fn connect_named(
        &mut self,
        from_pass: usize,
        from_port: &str,
        to_pass: usize,
        to_port: &str,
    ) -> Result<(), PipelineError> {
        if self.is_frozen() {
            return Err(PipelineError::PipelineFrozen);
        }
        let producer = self
            .ports
            .get(from_pass)
            .ok_or(PipelineError::UnknownPass(from_pass))?;
        let output = producer
            .output_index(from_port)
            .ok_or_else(|| PipelineError::UnknownPort {
                pass: producer.name.clone(),
                port: from_port.to_owned(),
            })?;
        let out_desc = producer.outputs[output].descriptor;
        let from_label = format!("{}.{}", producer.name, out_desc.name);

        let consumer = self
            .ports
            .get_mut(to_pass)
            .ok_or(PipelineError::UnknownPass(to_pass))?;
        let input = consumer
            .input_index(to_port)
            .ok_or_else(|| PipelineError::UnknownPort {
                pass: consumer.name.clone(),
                port: to_port.to_owned(),
            })?;
        let slot = &mut consumer.inputs[input];
        if slot.descriptor.type_id != out_desc.type_id {
            return Err(PipelineError::TypeMismatch {
                from: from_label,
                to: format!("{}.{}", consumer.name, slot.descriptor.name),
                expected: slot.descriptor.type_name,
                found: out_desc.type_name,
            });
        }
        if slot.binding.is_some() {
            return Err(PipelineError::AlreadyBound {
                pass: consumer.name.clone(),
                port: slot.descriptor.name,
            });
        }
        slot.binding = Some((from_pass, output));
        Ok(())
    }

    /// Validates the wiring and fixes the execution order.
    pub fn freeze(&mut self) -> Result<(), PipelineError> {
        if self.is_frozen() {
            return Err(PipelineError::PipelineFrozen);
        }
        for ports in &self.ports {
            if let Some(slot) = ports
                .inputs
                .iter()
                .find(|s| s.descriptor.required && s.binding.is_none())
            {
                return Err(PipelineError::UnboundPort {
                    pass: ports.name.clone(),
                    port: slot.descriptor.name,
                });
            }
        }

        // Kahn's algorithm; the ready set is ordered by index so independent
        // passes run in insertion order.
        let n = self.passes.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (consumer, ports) in self.ports.iter().enumerate() {
            let producers: BTreeSet<usize> = ports
                .inputs
                .iter()
                .filter_map(|s| s.binding.map(|(producer, _)| producer))
                .collect();
            for producer in producers {
                indegree[consumer] += 1;
                dependents[producer].push(consumer);
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &dependents[next] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != n {
            let passes = (0..n)
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.ports[i].name.clone())
                .collect();
            return Err(PipelineError::CycleDetected { passes });
        }

        debug!(
            order = ?order.iter().map(|&i| self.ports[i].name.as_str()).collect::<Vec<_>>(),
            "pipeline frozen"
        );
        self.order = Some(order);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Runs one frame: drains `events`, then runs every pass once in
    /// execution order. Any error abandons the frame.
    pub fn execute(
        &mut self,
        gc: &mut GraphicContext,
        events: impl IntoIterator<Item = FrameEvent>,
    ) -> Result<FrameStats, PipelineError> {
        let result = self.execute_frame(gc, events);
        if let Err(err) = &result {
            error!(frame = self.frame, "frame abandoned: {err}");
        }
        result
    }

    fn execute_frame(
        &mut self,
        gc: &mut GraphicContext,
        events: impl IntoIterator<Item = FrameEvent>,
    ) -> Result<FrameStats, PipelineError> {
        let order = self.order.as_ref().ok_or(PipelineError::NotFrozen)?;
        let start = Instant::now();

        let resize = events
            .into_iter()
            .map(|FrameEvent::Resized(size)| size)
            .last();
        if let Some(size) = resize {
            gc.resize(size);
        }

        if gc.is_context_lost() {
            return Err(GraphicsError::ContextLost.into());
        }
        gc.make_current()?;

        self.frame += 1;
        let frame = self.frame;
        let _frame_span = trace_span!("frame", frame).entered();

        // Host state is restored even when a pass abandons the frame.
        let outcome = run_passes(order, &mut self.passes, &mut self.ports, gc, frame);
        gc.end_frame();
        outcome?;

        Ok(FrameStats {
            frame,
            passes_run: order.len(),
            elapsed: start.elapsed(),
        })
    }

    /// Reads an input as its pass would see it in the current frame.
    pub fn read_input<T: PortValue>(&self, port: InPort<T>) -> Result<T, PipelineError> {
        read_input(&self.ports, port.pass, port.name, self.frame)?.ok_or_else(|| {
            PipelineError::UnboundPort {
                pass: self.ports[port.pass].name.clone(),
                port: port.name,
            }
        })
    }

    /// Reads the value an output produced in the current frame.
    pub fn read_output<T: PortValue>(&self, port: OutPort<T>) -> Result<T, PipelineError> {
        let ports = self
            .ports
            .get(port.pass)
            .ok_or(PipelineError::UnknownPass(port.pass))?;
        let slot = ports
            .output_index(port.name)
            .ok_or_else(|| PipelineError::UnknownPort {
                pass: ports.name.clone(),
                port: port.name.to_owned(),
            })?;
        read_output_slot(&self.ports, port.pass, slot, self.frame)?.ok_or_else(|| {
            PipelineError::StaleData {
                pass: ports.name.clone(),
                port: port.name,
            }
        })
    }

    pub fn pass<P: RenderPass>(&self, handle: PassHandle<P>) -> Option<&P> {
        self.passes.get(handle.index)?.as_any().downcast_ref()
    }

    pub fn pass_mut<P: RenderPass>(&mut self, handle: PassHandle<P>) -> Option<&mut P> {
        self.passes.get_mut(handle.index)?.as_any_mut().downcast_mut()
    }

    /// Releases every pass's resources in reverse construction order.
    pub fn destroy(mut self, gc: &mut GraphicContext) {
        while let Some(mut pass) = self.passes.pop() {
            debug!(pass = pass.name(), "releasing pass");
            pass.release(gc);
        }
    }
}

fn run_passes(
    order: &[usize],
    passes: &mut [Box<dyn RenderPass>],
    ports: &mut [PassPorts],
    gc: &mut GraphicContext,
    frame: u64,
) -> Result<(), PipelineError> {
    for &index in order {
        let pass = &mut passes[index];
        let _span = trace_span!("pass", name = pass.name()).entered();

        let mut io = PassIo {
            table: &mut *ports,
            pass: index,
            frame,
        };
        gc.begin_pass();
        let result = pass.run(gc, &mut io);
        gc.end_pass();
        result?;

        if let Some(port) = ports[index].missing_output(frame) {
            return Err(PipelineError::OutputNotProduced {
                pass: ports[index].name.clone(),
                port,
            });
        }
    }
    Ok(())
}
