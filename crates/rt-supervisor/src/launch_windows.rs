//! Windows contract stub.
//!
//! Spec §1/§6: the Windows family is covered only at the level of its
//! abstract contract ("same observable behavior using `CreateProcess`
//! equivalents and `WaitForSingleObject`"), not a real implementation —
//! out of scope the same way the managed-code generator and the GC
//! algorithm are. This module gives every public signature a body that
//! reports `Unsupported`, so a driver built for Windows links against
//! the same API shape as the POSIX path without silently doing nothing.

use crate::child::ProcessStatus;
use crate::error::SupervisorError;
use crate::live_list::LiveList;
use crate::types::StreamSpec;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::sync::Arc;

pub struct LaunchRequest {
    pub file: String,
    pub argv: Vec<String>,
    pub in_spec: StreamSpec,
    pub out_spec: StreamSpec,
    pub err_spec: StreamSpec,
    pub user_id: Option<String>,
    pub cleanup_files: bool,
    pub working_dir: Option<String>,
    pub env: Option<Vec<(String, String)>>,
}

pub struct Process {
    pub pid: u32,
    pub user_id: Option<String>,
    pub stdin: Option<BufWriter<File>>,
    pub stdout: Option<BufReader<File>>,
    pub stderr: Option<BufReader<File>>,
    status: Arc<ProcessStatus>,
}

impl Process {
    pub fn status(&self) -> &Arc<ProcessStatus> {
        &self.status
    }
}

pub fn launch(_list: &'static LiveList, _request: LaunchRequest) -> Result<Process, SupervisorError> {
    Err(SupervisorError::Unsupported)
}

pub fn delete_process_pipes(
    _stdin: Option<BufWriter<File>>,
    _stdout: Option<BufReader<File>>,
    _stderr: Option<BufReader<File>>,
) -> Result<(), SupervisorError> {
    Err(SupervisorError::Unsupported)
}
