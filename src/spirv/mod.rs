use std::collections::BTreeMap;

use crate::spirv::reader::{words_from_bytes, WordReader, HEADER_WORD_COUNT, MAGIC_NUMBER};

pub mod reader;

const OP_ENTRY_POINT: u16 = 15;
const OP_TYPE_STRUCT: u16 = 30;
const OP_TYPE_POINTER: u16 = 32;
const OP_VARIABLE: u16 = 59;
const OP_DECORATE: u16 = 71;
const OP_MEMBER_DECORATE: u16 = 72;

const DECORATION_BUFFER_BLOCK: u32 = 3;
const DECORATION_NON_WRITABLE: u32 = 24;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;

const STORAGE_CLASS_UNIFORM: u32 = 2;
const STORAGE_CLASS_STORAGE_BUFFER: u32 = 12;

/// Largest id bound any conforming SPIR-V module may declare.
const MAX_ID_BOUND: u32 = 0x3f_ffff;

pub const MAX_STORAGE_BUFFER_BINDINGS: u32 = 32;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Task,
    Mesh,
}

impl ShaderStage {
    pub fn from_execution_model(execution_model: u32) -> Option<Self> {
        match execution_model {
            0 => Some(Self::Vertex),
            4 => Some(Self::Fragment),
            5 => Some(Self::Compute),
            5267 | 5364 => Some(Self::Task),
            5268 | 5365 => Some(Self::Mesh),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ShaderReflectionError {
    #[error("SPIR-V byte length {0} is not a multiple of 4")]
    UnalignedLength(usize),
    #[error("SPIR-V module of {0} words is shorter than its header")]
    TruncatedHeader(usize),
    #[error("invalid SPIR-V magic number {0:#010x}")]
    InvalidMagic(u32),
    #[error("SPIR-V id bound {0} exceeds the supported maximum")]
    IdBoundTooLarge(u32),
    #[error("instruction at word {offset} has a word count of zero")]
    ZeroWordCount { offset: usize },
    #[error("instruction at word {offset} spans {word_count} words past the end of the module")]
    TruncatedInstruction { offset: usize, word_count: usize },
    #[error("instruction at word {offset} (opcode {opcode}) is missing operands")]
    MissingOperands { offset: usize, opcode: u16 },
    #[error("instruction at word {offset} holds an invalid string literal")]
    InvalidLiteral { offset: usize },
    #[error("id {id} is outside the module id bound {bound}")]
    IdOutOfBounds { id: u32, bound: u32 },
    #[error("unsupported execution model {0}")]
    UnsupportedExecutionModel(u32),
    #[error("module declares entry points for both {first:?} and {second:?} stages")]
    ConflictingStages {
        first: ShaderStage,
        second: ShaderStage,
    },
    #[error("module declares no entry point")]
    MissingEntryPoint,
    #[error("id {id} is decorated with {decoration} {value} after {previous}")]
    ConflictingDecoration {
        id: u32,
        decoration: &'static str,
        previous: u32,
        value: u32,
    },
    #[error("storage buffer {id} has no descriptor set or binding decoration")]
    MissingBinding { id: u32 },
    #[error("storage buffer {id} uses descriptor set {set}, only set 0 is supported")]
    UnsupportedDescriptorSet { id: u32, set: u32 },
    #[error("storage buffer {id} uses binding {binding}, bindings must be below 32")]
    BindingOutOfRange { id: u32, binding: u32 },
    #[error("binding {binding} is declared by more than one storage buffer")]
    BindingCollision { binding: u32 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShaderReflection {
    pub stage: ShaderStage,
    pub entry_point: String,
    /// Bit `i` is set when binding `i` of set 0 is a storage buffer.
    pub storage_buffer_mask: u32,
    /// Subset of `storage_buffer_mask` not decorated as read-only.
    pub writable_storage_buffer_mask: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum IdKind {
    #[default]
    Unknown,
    Struct,
    Pointer {
        pointee: u32,
    },
    Variable {
        pointer_type: u32,
        storage_class: u32,
    },
}

#[derive(Clone, Copy, Debug, Default)]
struct IdRecord {
    kind: IdKind,
    descriptor_set: Option<u32>,
    binding: Option<u32>,
    non_writable: bool,
    has_non_writable_member: bool,
    buffer_block: bool,
}

/// Records of the ids a module actually references, keyed in ascending id order.
struct IdTable {
    bound: u32,
    records: BTreeMap<u32, IdRecord>,
}

static UNREFERENCED_ID: IdRecord = IdRecord {
    kind: IdKind::Unknown,
    descriptor_set: None,
    binding: None,
    non_writable: false,
    has_non_writable_member: false,
    buffer_block: false,
};

impl IdTable {
    fn with_bound(bound: u32) -> Self {
        Self {
            bound,
            records: BTreeMap::new(),
        }
    }

    fn check_bound(&self, id: u32) -> Result<(), ShaderReflectionError> {
        if id >= self.bound {
            return Err(ShaderReflectionError::IdOutOfBounds {
                id,
                bound: self.bound,
            });
        }

        Ok(())
    }

    fn get(&self, id: u32) -> Result<&IdRecord, ShaderReflectionError> {
        self.check_bound(id)?;

        Ok(self.records.get(&id).unwrap_or(&UNREFERENCED_ID))
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut IdRecord, ShaderReflectionError> {
        self.check_bound(id)?;

        Ok(self.records.entry(id).or_default())
    }

    /// The struct a pointer-typed variable points at, if any.
    fn pointee_struct(&self, pointer_type: u32) -> Result<Option<&IdRecord>, ShaderReflectionError> {
        let pointee = match self.get(pointer_type)?.kind {
            IdKind::Pointer { pointee } => self.get(pointee)?,
            _ => return Ok(None),
        };

        Ok(match pointee.kind {
            IdKind::Struct => Some(pointee),
            _ => None,
        })
    }
}

fn record_decoration(
    slot: &mut Option<u32>,
    id: u32,
    decoration: &'static str,
    value: u32,
) -> Result<(), ShaderReflectionError> {
    match *slot {
        Some(previous) if previous != value => Err(ShaderReflectionError::ConflictingDecoration {
            id,
            decoration,
            previous,
            value,
        }),
        _ => {
            *slot = Some(value);
            Ok(())
        }
    }
}

impl ShaderReflection {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ShaderReflectionError> {
        Self::from_words(&words_from_bytes(bytes)?)
    }

    pub fn from_words(words: &[u32]) -> Result<Self, ShaderReflectionError> {
        let mut reader = WordReader::new(words);

        let header = reader
            .read_slice(HEADER_WORD_COUNT)
            .ok_or(ShaderReflectionError::TruncatedHeader(words.len()))?;

        if header[0] != MAGIC_NUMBER {
            return Err(ShaderReflectionError::InvalidMagic(header[0]));
        }

        let bound = header[3];
        if bound > MAX_ID_BOUND {
            return Err(ShaderReflectionError::IdBoundTooLarge(bound));
        }

        let mut ids = IdTable::with_bound(bound);
        let mut entry_point: Option<(ShaderStage, String)> = None;

        while let Some(instruction) = reader.next_instruction()? {
            match instruction.opcode {
                OP_ENTRY_POINT => {
                    let execution_model = instruction.operand(0)?;
                    let stage = ShaderStage::from_execution_model(execution_model).ok_or(
                        ShaderReflectionError::UnsupportedExecutionModel(execution_model),
                    )?;
                    let (name, _) = instruction.literal_string(2)?;

                    match &entry_point {
                        Some((first, _)) if *first != stage => {
                            return Err(ShaderReflectionError::ConflictingStages {
                                first: *first,
                                second: stage,
                            })
                        }
                        Some(_) => {}
                        None => entry_point = Some((stage, name)),
                    }
                }
                OP_DECORATE => {
                    let id = instruction.operand(0)?;
                    let decoration = instruction.operand(1)?;
                    let record = ids.get_mut(id)?;

                    match decoration {
                        DECORATION_DESCRIPTOR_SET => record_decoration(
                            &mut record.descriptor_set,
                            id,
                            "DescriptorSet",
                            instruction.operand(2)?,
                        )?,
                        DECORATION_BINDING => record_decoration(
                            &mut record.binding,
                            id,
                            "Binding",
                            instruction.operand(2)?,
                        )?,
                        DECORATION_NON_WRITABLE => record.non_writable = true,
                        DECORATION_BUFFER_BLOCK => record.buffer_block = true,
                        _ => {}
                    }
                }
                OP_MEMBER_DECORATE => {
                    let id = instruction.operand(0)?;
                    if instruction.operand(2)? == DECORATION_NON_WRITABLE {
                        ids.get_mut(id)?.has_non_writable_member = true;
                    }
                }
                OP_TYPE_STRUCT => {
                    ids.get_mut(instruction.operand(0)?)?.kind = IdKind::Struct;
                }
                OP_TYPE_POINTER => {
                    let id = instruction.operand(0)?;
                    let pointee = instruction.operand(2)?;
                    ids.get_mut(id)?.kind = IdKind::Pointer { pointee };
                }
                OP_VARIABLE => {
                    let pointer_type = instruction.operand(0)?;
                    let id = instruction.operand(1)?;
                    let storage_class = instruction.operand(2)?;
                    ids.get_mut(id)?.kind = IdKind::Variable {
                        pointer_type,
                        storage_class,
                    };
                }
                _ => {}
            }
        }

        let (stage, entry_point) = entry_point.ok_or(ShaderReflectionError::MissingEntryPoint)?;

        let mut storage_buffer_mask = 0u32;
        let mut writable_storage_buffer_mask = 0u32;

        for (&id, record) in ids.records.iter() {
            let (pointer_type, storage_class) = match record.kind {
                IdKind::Variable {
                    pointer_type,
                    storage_class,
                } => (pointer_type, storage_class),
                _ => continue,
            };

            let pointee = ids.pointee_struct(pointer_type)?;

            let is_storage_buffer = match storage_class {
                STORAGE_CLASS_STORAGE_BUFFER => true,
                STORAGE_CLASS_UNIFORM => pointee.is_some_and(|pointee| pointee.buffer_block),
                _ => false,
            };

            if !is_storage_buffer {
                continue;
            }

            let (set, binding) = match (record.descriptor_set, record.binding) {
                (Some(set), Some(binding)) => (set, binding),
                _ => return Err(ShaderReflectionError::MissingBinding { id }),
            };

            if set != 0 {
                return Err(ShaderReflectionError::UnsupportedDescriptorSet { id, set });
            }

            if binding >= MAX_STORAGE_BUFFER_BINDINGS {
                return Err(ShaderReflectionError::BindingOutOfRange { id, binding });
            }

            let bit = 1u32 << binding;

            if storage_buffer_mask & bit != 0 {
                return Err(ShaderReflectionError::BindingCollision { binding });
            }

            let read_only = record.non_writable
                || pointee.is_some_and(|pointee| pointee.has_non_writable_member);

            storage_buffer_mask |= bit;
            if !read_only {
                writable_storage_buffer_mask |= bit;
            }
        }

        let reflection = Self {
            stage,
            entry_point,
            storage_buffer_mask,
            writable_storage_buffer_mask,
        };

        log::debug!("Reflected shader module: {reflection:?}");

        Ok(reflection)
    }
}
