//! Classfile patching before first load.
//!
//! The target binary is never rebuilt; instead, its jar is unpacked into a
//! scratch directory, selected classfiles are rewritten there, and the scratch
//! directory is put ahead of the jar on the class search path so the rewritten
//! copies win. All of this must finish before the first class is resolved -
//! afterwards a patch can never take effect, which is why the pipeline is a
//! strict state machine and late registration is fatal.
//!
//! Edits are declarative [`PatchUnit`]s: add a field, add a method with a
//! pre-assembled body, or rewrite an existing method by renaming it and
//! synthesizing a forwarder that calls a static hook first
//! ([`PatchEdit::WrapMethod`] passes the receiver and arguments to the hook,
//! [`PatchEdit::InsertCall`] just notifies it). Forwarder bodies are assembled
//! by [`emit`] and are always straight-line code.

pub(crate) mod emit;
mod pipeline;
mod unit;

pub use pipeline::{BytecodePatchPipeline, PipelineState, ScratchDir};
pub use unit::{ClassTarget, HookRef, MethodTarget, PatchEdit, PatchUnit, RENAME_SUFFIX};
