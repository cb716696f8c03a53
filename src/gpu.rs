// NVIDIA GPU detection using NVML
use log::debug;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuInfo {
    pub name: String,
    pub memory_total_mb: u64,
    pub memory_free_mb: u64,
}

fn query_first_gpu() -> Result<GpuInfo, NvmlError> {
    let nvml = Nvml::init()?;
    let device = nvml.device_by_index(0)?;
    let memory_info = device.memory_info()?;

    Ok(GpuInfo {
        name: device.name()?,
        memory_total_mb: memory_info.total / (1024 * 1024),
        memory_free_mb: memory_info.free / (1024 * 1024),
    })
}

/// First NVIDIA GPU, or None without drivers or a device
pub fn detect_gpu() -> Option<GpuInfo> {
    match query_first_gpu() {
        Ok(info) => Some(info),
        Err(e) => {
            debug!("No usable NVIDIA GPU: {}", e);
            None
        }
    }
}

/// Check if an NVIDIA GPU is available
pub fn gpu_available() -> bool {
    detect_gpu().is_some()
}
