// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ota-core: Result model, result tree and workflow handle for the OTA agent

pub mod event;
pub mod id;
pub mod manifest;
pub mod result;
pub mod result_tree;
pub mod state;
pub mod workflow;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use event::{ComponentUpdate, Event, Step, StepOutcome};
pub use id::{FileId, WorkflowId};
pub use manifest::{ContentData, FileEntity, UpdateId, UpdateType};
pub use result::{code, erc, UpdateResult};
pub use result_tree::{NodeRecord, ResultNode, ResultTree, TreeError, ROOT_PATH};
pub use state::{
    AgentRestartState, CancellationType, Phase, SystemRebootState, UnknownValue, UpdateAction,
    UpdateState,
};
pub use workflow::{CancellationFlag, Instruction, ParseError, WorkflowHandle};
