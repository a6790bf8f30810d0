//! Platform and device introspection.

use std::fmt;

use tracing::warn;

/// `major.minor` from a platform version string such as
/// `"OpenCL 3.0 CUDA 12.2.148"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ClVersion {
    pub major: u32,
    pub minor: u32,
}

impl ClVersion {
    pub const V1_2: ClVersion = ClVersion { major: 1, minor: 2 };

    pub fn parse(text: &str) -> Option<Self> {
        const PREFIX: &str = "OpenCL ";
        let start = text.find(PREFIX)? + PREFIX.len();
        let token = text[start..].split_whitespace().next()?;
        let (major, minor) = token.split_once('.')?;
        let minor: String = minor.chars().take_while(char::is_ascii_digit).collect();
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Parses a platform's version string. A malformed string is logged and
    /// treated as `0.0` by the callers, so enumeration carries on without
    /// the version-gated fields.
    pub fn from_platform(text: &str) -> Option<Self> {
        let version = Self::parse(text);
        if version.is_none() {
            warn!(version = text, "could not parse OpenCL version, assuming 0.0");
        }
        version
    }
}

impl fmt::Display for ClVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// `CL_DEVICE_TYPE_*` of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Default,
    Cpu,
    Gpu,
    Accelerator,
    Custom,
    Host,
    Unknown(u64),
}

impl DeviceKind {
    pub fn from_bits(bits: u64) -> Self {
        match bits {
            1 => DeviceKind::Default,
            2 => DeviceKind::Cpu,
            4 => DeviceKind::Gpu,
            8 => DeviceKind::Accelerator,
            16 => DeviceKind::Custom,
            65536 => DeviceKind::Host,
            other => DeviceKind::Unknown(other),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Default => f.write_str("Default"),
            DeviceKind::Cpu => f.write_str("CPU"),
            DeviceKind::Gpu => f.write_str("GPU"),
            DeviceKind::Accelerator => f.write_str("Accelerator"),
            DeviceKind::Custom => f.write_str("Custom"),
            DeviceKind::Host => f.write_str("Host"),
            DeviceKind::Unknown(bits) => write!(f, "Unknown ({bits:#x})"),
        }
    }
}

/// Capability fields of one device, already rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub name: String,
    pub kind: DeviceKind,
    pub unified_memory: String,
    pub image2d_max: (String, String),
    pub image3d_max: (String, String, String),
    pub max_clock_mhz: String,
    pub global_mem_bytes: String,
    pub local_mem_bytes: String,
    pub max_work_group_size: String,
    pub max_work_item_sizes: String,
    /// Only queried on platforms reporting OpenCL 1.2 or later.
    pub image_max_buffer_size: Option<String>,
    pub image_max_array_size: Option<String>,
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\t{}:", self.name)?;
        writeln!(f, "\t\tDevice type: {}", self.kind)?;
        writeln!(f, "\t\tUnified Memory: {}", self.unified_memory)?;
        writeln!(f, "\t\tMax 2D Shape: ({}, {})", self.image2d_max.0, self.image2d_max.1)?;
        writeln!(
            f,
            "\t\tMax 3D Shape: ({}, {}, {})",
            self.image3d_max.0, self.image3d_max.1, self.image3d_max.2
        )?;
        writeln!(f, "\t\tMaximum Clock Frequency (MHz): {}", self.max_clock_mhz)?;
        writeln!(f, "\t\tGlobal Memory (bytes): {}", self.global_mem_bytes)?;
        writeln!(f, "\t\tLocal Memory (bytes): {}", self.local_mem_bytes)?;
        writeln!(f, "\t\tMax Work-Group Size: {}", self.max_work_group_size)?;
        write!(f, "\t\tMax Work-Item Sizes: {}", self.max_work_item_sizes)?;
        if let Some(size) = &self.image_max_buffer_size {
            write!(f, "\n\t\tMax Image Buffer Size: {size}")?;
        }
        if let Some(size) = &self.image_max_array_size {
            write!(f, "\n\t\tMax Image Array Size: {size}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformReport {
    pub name: String,
    pub vendor: String,
    pub version_text: String,
    /// `None` when the version string could not be parsed.
    pub version: Option<ClVersion>,
    pub devices: Vec<DeviceReport>,
}

impl PlatformReport {
    /// Whether the version-gated 1.2 fields apply.
    pub fn has_1_2_fields(&self) -> bool {
        self.version.unwrap_or_default() >= ClVersion::V1_2
    }
}

impl fmt::Display for PlatformReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} | {}", self.name, self.vendor, self.version_text)?;
        if self.version.is_none() {
            write!(f, "\n\tCould not parse OpenCL version for this platform.")?;
        }
        if self.devices.is_empty() {
            return write!(f, "\n\tNo devices for this platform.");
        }
        for device in &self.devices {
            write!(f, "\n{device}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "opencl")]
pub use self::query::enumerate;

#[cfg(feature = "opencl")]
mod query {
    use ocl::core::get_platform_ids;
    use ocl::enums::{DeviceInfo, DeviceInfoResult, PlatformInfo};
    use ocl::{Device, Platform};
    use tracing::debug;

    use super::{ClVersion, DeviceKind, DeviceReport, PlatformReport};
    use crate::error::{BenchError, Result};

    /// Lists every platform visible through the ICD loader with its devices.
    pub fn enumerate() -> Result<Vec<PlatformReport>> {
        let ids = get_platform_ids().map_err(|e| BenchError::DeviceUnavailable(e.to_string()))?;
        let mut reports = Vec::with_capacity(ids.len());

        for id in ids {
            let platform = Platform::new(id);
            let text = |kind: PlatformInfo| {
                platform
                    .info(kind)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|_| "unavailable".into())
            };
            let version_text = text(PlatformInfo::Version);
            let version = ClVersion::from_platform(&version_text);
            let gated = version.unwrap_or_default() >= ClVersion::V1_2;

            let devices = match Device::list_all(platform) {
                Ok(devices) => devices,
                Err(err) => {
                    debug!(%err, "no devices listed for platform");
                    Vec::new()
                }
            };

            reports.push(PlatformReport {
                name: text(PlatformInfo::Name),
                vendor: text(PlatformInfo::Vendor),
                version_text,
                version,
                devices: devices.iter().map(|d| describe(d, gated)).collect(),
            });
        }
        Ok(reports)
    }

    fn describe(device: &Device, gated: bool) -> DeviceReport {
        let info = |kind: DeviceInfo| match device.info(kind) {
            Ok(value) => value.to_string(),
            Err(err) => {
                debug!(%err, "device query failed");
                "unavailable".into()
            }
        };
        let kind = match device.info(DeviceInfo::Type) {
            Ok(DeviceInfoResult::Type(ty)) => DeviceKind::from_bits(ty.bits()),
            _ => DeviceKind::Unknown(0),
        };

        DeviceReport {
            name: info(DeviceInfo::Name),
            kind,
            unified_memory: info(DeviceInfo::HostUnifiedMemory),
            image2d_max: (info(DeviceInfo::Image2dMaxHeight), info(DeviceInfo::Image2dMaxWidth)),
            image3d_max: (
                info(DeviceInfo::Image3dMaxHeight),
                info(DeviceInfo::Image3dMaxWidth),
                info(DeviceInfo::Image3dMaxDepth),
            ),
            max_clock_mhz: info(DeviceInfo::MaxClockFrequency),
            global_mem_bytes: info(DeviceInfo::GlobalMemSize),
            local_mem_bytes: info(DeviceInfo::LocalMemSize),
            max_work_group_size: info(DeviceInfo::MaxWorkGroupSize),
            max_work_item_sizes: info(DeviceInfo::MaxWorkItemSizes),
            image_max_buffer_size: gated.then(|| info(DeviceInfo::ImageMaxBufferSize)),
            image_max_array_size: gated.then(|| info(DeviceInfo::ImageMaxArraySize)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(gated: bool) -> DeviceReport {
        DeviceReport {
            name: "Test GPU".into(),
            kind: DeviceKind::Gpu,
            unified_memory: "false".into(),
            image2d_max: ("16384".into(), "16384".into()),
            image3d_max: ("2048".into(), "2048".into(), "2048".into()),
            max_clock_mhz: "1500".into(),
            global_mem_bytes: "8589934592".into(),
            local_mem_bytes: "49152".into(),
            max_work_group_size: "1024".into(),
            max_work_item_sizes: "[1024, 1024, 64]".into(),
            image_max_buffer_size: gated.then(|| "134217728".into()),
            image_max_array_size: gated.then(|| "2048".into()),
        }
    }

    #[test]
    fn parses_vendor_version_strings() {
        assert_eq!(
            ClVersion::parse("OpenCL 3.0 CUDA 12.2.148"),
            Some(ClVersion { major: 3, minor: 0 })
        );
        assert_eq!(
            ClVersion::parse("OpenCL 1.2 pocl 1.8"),
            Some(ClVersion { major: 1, minor: 2 })
        );
        assert_eq!(
            ClVersion::parse("OpenCL 2.1-rc AMD-APP"),
            Some(ClVersion { major: 2, minor: 1 })
        );
    }

    #[test]
    fn malformed_version_falls_back_to_zero() {
        assert_eq!(ClVersion::parse("Version unknown"), None);
        assert_eq!(ClVersion::parse("OpenCL x.y"), None);
        assert_eq!(ClVersion::from_platform("OpenCL"), None);
    }

    #[test]
    fn version_ordering_gates_fields() {
        assert!(ClVersion { major: 3, minor: 0 } >= ClVersion::V1_2);
        assert!(ClVersion { major: 1, minor: 1 } < ClVersion::V1_2);
    }

    #[test]
    fn device_type_bits() {
        assert_eq!(DeviceKind::from_bits(4), DeviceKind::Gpu);
        assert_eq!(DeviceKind::from_bits(65536).to_string(), "Host");
        assert_eq!(DeviceKind::from_bits(6), DeviceKind::Unknown(6));
    }

    #[test]
    fn renders_platform_with_gated_fields() {
        let report = PlatformReport {
            name: "NVIDIA CUDA".into(),
            vendor: "NVIDIA Corporation".into(),
            version_text: "OpenCL 3.0 CUDA 12.2.148".into(),
            version: ClVersion::parse("OpenCL 3.0 CUDA 12.2.148"),
            devices: vec![device(true)],
        };
        assert!(report.has_1_2_fields());
        let text = report.to_string();
        assert!(text.starts_with("NVIDIA CUDA | NVIDIA Corporation | OpenCL 3.0"));
        assert!(text.contains("\tTest GPU:\n\t\tDevice type: GPU"));
        assert!(text.contains("Max 3D Shape: (2048, 2048, 2048)"));
        assert!(text.contains("Max Image Array Size: 2048"));
    }

    #[test]
    fn renders_fallbacks_for_old_or_empty_platforms() {
        let report = PlatformReport {
            name: "Odd".into(),
            vendor: "Nobody".into(),
            version_text: "garbage".into(),
            version: None,
            devices: Vec::new(),
        };
        assert!(!report.has_1_2_fields());
        let text = report.to_string();
        assert!(text.contains("Could not parse OpenCL version"));
        assert!(text.ends_with("No devices for this platform."));

        let old = device(false).to_string();
        assert!(!old.contains("Max Image Buffer Size"));
    }
}
