//! Typed data ports.
//!
//! Ports are plain data: a name and a type. Passes declare them as associated
//! constants and the pipeline stores values and wiring in a table indexed by
//! pass, so no port ever points at another.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use crate::error::PipelineError;

/// Values that can flow between passes.
pub trait PortValue: Clone + 'static {}

impl<T: Clone + 'static> PortValue for T {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Type-erased port declaration, as returned by
/// [`crate::RenderPass::ports`].
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub name: &'static str,
    pub direction: PortDirection,
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Only meaningful for inputs.
    pub required: bool,
}

impl fmt::Debug for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortDescriptor")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .field("type", &self.type_name)
            .field("required", &self.required)
            .finish()
    }
}

/// Input slot of type `T`.
pub struct InData<T> {
    name: &'static str,
    required: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for InData<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InData<T> {}

impl<T> fmt::Debug for InData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InData<{}>({})", type_name::<T>(), self.name)
    }
}

impl<T> InData<T> {
    /// A required input; the pipeline refuses to freeze while it is unbound.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            _marker: PhantomData,
        }
    }

    /// An input the pass can run without.
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl<T: PortValue> InData<T> {
    pub fn descriptor(&self) -> PortDescriptor {
        PortDescriptor {
            name: self.name,
            direction: PortDirection::Input,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            required: self.required,
        }
    }

    /// Reads the value produced upstream this frame.
    pub fn get(&self, io: &PassIo<'_>) -> Result<T, PipelineError> {
        io.get(self)
    }
}

/// Output slot of type `T`.
pub struct OutData<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for OutData<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for OutData<T> {}

impl<T> fmt::Debug for OutData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutData<{}>({})", type_name::<T>(), self.name)
    }
}

impl<T> OutData<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: PortValue> OutData<T> {
    pub fn descriptor(&self) -> PortDescriptor {
        PortDescriptor {
            name: self.name,
            direction: PortDirection::Output,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            required: false,
        }
    }

    /// Stores this frame's value and marks it produced.
    pub fn set(&self, io: &mut PassIo<'_>, value: T) -> Result<(), PipelineError> {
        io.set(self, value)
    }
}

// ---------------------------------------------------------------------------
// Port table
// ---------------------------------------------------------------------------

pub(crate) struct OutputSlot {
    pub(crate) descriptor: PortDescriptor,
    value: Option<Box<dyn Any>>,
    produced_frame: Option<u64>,
}

pub(crate) struct InputSlot {
    pub(crate) descriptor: PortDescriptor,
    /// `(producer pass, output slot)`.
    pub(crate) binding: Option<(usize, usize)>,
}

#[derive(Default)]
pub(crate) struct PassPorts {
    pub(crate) name: String,
    pub(crate) inputs: Vec<InputSlot>,
    pub(crate) outputs: Vec<OutputSlot>,
}

impl PassPorts {
    pub(crate) fn new(name: String, ports: &[PortDescriptor]) -> Result<Self, PipelineError> {
        let mut table = PassPorts {
            name,
            ..Default::default()
        };
        for (i, port) in ports.iter().enumerate() {
            if ports[..i]
                .iter()
                .any(|p| p.name == port.name && p.direction == port.direction)
            {
                return Err(PipelineError::DuplicatePort {
                    pass: table.name,
                    port: port.name,
                });
            }
            match port.direction {
                PortDirection::Input => table.inputs.push(InputSlot {
                    descriptor: *port,
                    binding: None,
                }),
                PortDirection::Output => table.outputs.push(OutputSlot {
                    descriptor: *port,
                    value: None,
                    produced_frame: None,
                }),
            }
        }
        Ok(table)
    }

    pub(crate) fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|s| s.descriptor.name == name)
    }

    pub(crate) fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|s| s.descriptor.name == name)
    }

    /// First declared output not written in `frame`.
    pub(crate) fn missing_output(&self, frame: u64) -> Option<&'static str> {
        self.outputs
            .iter()
            .find(|s| s.produced_frame != Some(frame))
            .map(|s| s.descriptor.name)
    }
}

/// Resolves a bound input to the value its producer wrote in `frame`.
pub(crate) fn read_input<T: PortValue>(
    table: &[PassPorts],
    pass: usize,
    name: &'static str,
    frame: u64,
) -> Result<Option<T>, PipelineError> {
    let ports = table.get(pass).ok_or(PipelineError::UnknownPass(pass))?;
    let slot = ports
        .input_index(name)
        .map(|i| &ports.inputs[i])
        .ok_or_else(|| PipelineError::UnknownPort {
            pass: ports.name.clone(),
            port: name.to_owned(),
        })?;
    let Some((producer, output)) = slot.binding else {
        if slot.descriptor.required {
            return Err(PipelineError::UnboundPort {
                pass: ports.name.clone(),
                port: name,
            });
        }
        return Ok(None);
    };
    read_output_slot(table, producer, output, frame).map_err(|err| match err {
        PipelineError::StaleData { .. } => PipelineError::StaleData {
            pass: ports.name.clone(),
            port: name,
        },
        other => other,
    })
}

pub(crate) fn read_output_slot<T: PortValue>(
    table: &[PassPorts],
    pass: usize,
    output: usize,
    frame: u64,
) -> Result<Option<T>, PipelineError> {
    let ports = table.get(pass).ok_or(PipelineError::UnknownPass(pass))?;
    let slot = &ports.outputs[output];
    let value = match (&slot.value, slot.produced_frame) {
        (Some(value), Some(produced)) if produced == frame => value,
        _ => {
            return Err(PipelineError::StaleData {
                pass: ports.name.clone(),
                port: slot.descriptor.name,
            })
        }
    };
    value
        .downcast_ref::<T>()
        .cloned()
        .map(Some)
        .ok_or(PipelineError::TypeMismatch {
            from: format!("{}.{}", ports.name, slot.descriptor.name),
            to: type_name::<T>().to_owned(),
            expected: type_name::<T>(),
            found: slot.descriptor.type_name,
        })
}

/// A pass's view of the port table while it runs.
pub struct PassIo<'a> {
    pub(crate) table: &'a mut [PassPorts],
    pub(crate) pass: usize,
    pub(crate) frame: u64,
}

impl PassIo<'_> {
    /// Frame counter, starting at 1 for the first executed frame.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Reads a required input.
    pub fn get<T: PortValue>(&self, port: &InData<T>) -> Result<T, PipelineError> {
        read_input(&*self.table, self.pass, port.name, self.frame)?.ok_or_else(|| {
            PipelineError::UnboundPort {
                pass: self.table[self.pass].name.clone(),
                port: port.name,
            }
        })
    }

    /// Reads an input, `None` when an optional input is unbound.
    pub fn try_get<T: PortValue>(&self, port: &InData<T>) -> Result<Option<T>, PipelineError> {
        read_input(&*self.table, self.pass, port.name, self.frame)
    }

    /// Writes an output. Each output is written exactly once per frame.
    pub fn set<T: PortValue>(&mut self, port: &OutData<T>, value: T) -> Result<(), PipelineError> {
        let ports = &mut self.table[self.pass];
        let index = ports
            .output_index(port.name)
            .ok_or_else(|| PipelineError::UnknownPort {
                pass: ports.name.clone(),
                port: port.name.to_owned(),
            })?;
        let slot = &mut ports.outputs[index];
        if slot.descriptor.type_id != TypeId::of::<T>() {
            return Err(PipelineError::TypeMismatch {
                from: type_name::<T>().to_owned(),
                to: format!("{}.{}", ports.name, port.name),
                expected: slot.descriptor.type_name,
                found: type_name::<T>(),
            });
        }
        if slot.produced_frame == Some(self.frame) {
            return Err(PipelineError::OutputAlreadyWritten {
                pass: ports.name.clone(),
                port: port.name,
            });
        }
        slot.value = Some(Box::new(value));
        slot.produced_frame = Some(self.frame);
        Ok(())
    }
}
