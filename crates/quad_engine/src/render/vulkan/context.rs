//! Vulkan context management
//!
//! Instance, debug messenger, surface, physical device selection and the
//! logical device with its graphics and present queues. Everything here is
//! created once at startup and lives until shutdown.

use std::collections::BTreeSet;
use std::ffi::{c_void, CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use thiserror::Error;

use super::diagnostics::{self, LogSink, ValidationSink};
use super::window::{Window, WindowError};
use crate::core::config::{DEVICE_EXTENSIONS, ENABLE_VALIDATION, VALIDATION_LAYERS};

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// A requested validation layer is not installed
    #[error("Validation layer not available: {0}")]
    MissingValidationLayer(String),

    /// No memory type satisfies both the resource and the requested properties
    #[error("No suitable memory type found (type bits {type_filter:#b}, properties {properties:?})")]
    NoSuitableMemoryType {
        /// Memory type bits allowed by the resource
        type_filter: u32,
        /// Properties the memory must have
        properties: vk::MemoryPropertyFlags,
    },

    /// Image layout transition with no barrier recipe
    #[error("Unsupported layout transition: {old:?} -> {new:?}")]
    UnsupportedLayoutTransition {
        /// Current layout
        old: vk::ImageLayout,
        /// Requested layout
        new: vk::ImageLayout,
    },

    /// Texture pixels do not match their declared size
    #[error("Invalid texture data: {0}")]
    InvalidTexture(String),

    /// Window system failure while creating Vulkan objects
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

/// Requested names that are absent from `available`
pub fn missing_names<'a>(requested: &[&'a str], available: &[String]) -> Vec<&'a str> {
    requested
        .iter()
        .copied()
        .filter(|name| !available.iter().any(|have| have == name))
        .collect()
}

fn to_cstrings(names: &[&str]) -> VulkanResult<Vec<CString>> {
    names
        .iter()
        .map(|name| {
            CString::new(*name).map_err(|_| {
                VulkanError::InitializationFailed(format!("Name contains a NUL byte: {name}"))
            })
        })
        .collect()
}

fn fixed_name(raw: &[std::os::raw::c_char]) -> String {
    // Vulkan guarantees these fixed arrays are NUL terminated
    unsafe { CStr::from_ptr(raw.as_ptr()) }.to_string_lossy().into_owned()
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    // Boxed twice so the pointer handed to the messenger stays put
    _sink: Option<Box<Box<dyn ValidationSink>>>,
}

impl VulkanInstance {
    /// Create an instance with validation routed to the `log` facade
    pub fn new(window: &Window, app_name: &str, enable_validation: bool) -> VulkanResult<Self> {
        Self::with_sink(window, app_name, enable_validation, Box::new(LogSink))
    }

    /// Create an instance with validation messages delivered to `sink`
    pub fn with_sink(
        window: &Window,
        app_name: &str,
        enable_validation: bool,
        sink: Box<dyn ValidationSink>,
    ) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e}")))?;

        if enable_validation {
            Self::check_validation_layers(&entry)?;
        }

        let app_name_cstr = CString::new(app_name)
            .map_err(|_| VulkanError::InitializationFailed("Application name contains NUL".to_string()))?;
        let engine_name_cstr = CString::new("Quad Engine")
            .map_err(|_| VulkanError::InitializationFailed("Engine name contains NUL".to_string()))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let required_extensions = window.required_instance_extensions()?;
        let mut extension_names = required_extensions
            .iter()
            .map(|ext| CString::new(ext.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VulkanError::InitializationFailed("Bad extension name".to_string()))?;
        if enable_validation {
            extension_names.push(DebugUtils::name().to_owned());
        }
        let extension_ptrs: Vec<*const std::os::raw::c_char> =
            extension_names.iter().map(|ext| ext.as_ptr()).collect();

        let layer_names = if enable_validation { to_cstrings(VALIDATION_LAYERS)? } else { Vec::new() };
        let layer_ptrs: Vec<*const std::os::raw::c_char> =
            layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe { entry.create_instance(&create_info, None).map_err(VulkanError::Api)? };

        let mut sink = Box::new(sink);
        let (debug_utils, sink) = if enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            let user_data = (&mut *sink as *mut Box<dyn ValidationSink>).cast::<c_void>();
            match Self::setup_debug_messenger(&debug_utils, user_data) {
                Ok(messenger) => (Some((debug_utils, messenger)), Some(sink)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        log::debug!(
            "Vulkan instance created ({} extensions, validation {})",
            extension_ptrs.len(),
            if enable_validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            debug_utils,
            _sink: sink,
        })
    }

    fn check_validation_layers(entry: &Entry) -> VulkanResult<()> {
        #[allow(unused_unsafe)]
        let layers = unsafe { entry.enumerate_instance_layer_properties() }.map_err(VulkanError::Api)?;
        let available: Vec<String> = layers
            .iter()
            .map(|layer| fixed_name(&layer.layer_name))
            .collect();

        match missing_names(VALIDATION_LAYERS, &available).first() {
            Some(missing) => Err(VulkanError::MissingValidationLayer((*missing).to_string())),
            None => Ok(()),
        }
    }

    fn setup_debug_messenger(
        debug_utils: &DebugUtils,
        user_data: *mut c_void,
    ) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(diagnostics::subscribed_severities())
            .message_type(diagnostics::subscribed_types())
            .pfn_user_callback(Some(diagnostics::debug_callback))
            .user_data(user_data);

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = self.debug_utils.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Graphics and present queue family indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family supporting graphics commands
    pub graphics: u32,
    /// Family able to present to the surface
    pub present: u32,
}

impl QueueFamilies {
    /// Pick the first graphics family and the first family able to present
    ///
    /// `supports_present` is asked about each family index in order.
    pub fn find(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> VulkanResult<bool>,
    ) -> Option<Self> {
        let mut graphics = None;
        let mut present = None;

        for (index, family) in (0u32..).zip(families) {
            if graphics.is_none() && family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics = Some(index);
            }
            if present.is_none() && supports_present(index).unwrap_or(false) {
                present = Some(index);
            }
            if graphics.is_some() && present.is_some() {
                break;
            }
        }

        Some(Self {
            graphics: graphics?,
            present: present?,
        })
    }

    /// Distinct family indices, for queue creation and concurrent sharing
    pub fn unique(&self) -> Vec<u32> {
        BTreeSet::from([self.graphics, self.present]).into_iter().collect()
    }

    /// Whether one family does both jobs
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }
}

/// Physical device selection and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Supported device features
    pub features: vk::PhysicalDeviceFeatures,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Selected queue families
    pub queue_families: QueueFamilies,
}

impl PhysicalDeviceInfo {
    /// Select the first GPU that can render to `surface`
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices().map_err(VulkanError::Api)? };
        if devices.is_empty() {
            return Err(VulkanError::InitializationFailed("No Vulkan capable GPU found".to_string()));
        }

        for device in devices {
            match Self::evaluate_device(instance, device, surface, surface_loader) {
                Ok(info) => {
                    log::info!("Selected GPU: {}", info.name());
                    return Ok(info);
                }
                Err(reason) => log::debug!("Skipping GPU: {reason}"),
            }
        }

        Err(VulkanError::InitializationFailed("No suitable GPU found".to_string()))
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let features = unsafe { instance.get_physical_device_features(device) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let queue_families = QueueFamilies::find(&families, |index| unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .map_err(VulkanError::Api)
        })
        .ok_or_else(|| VulkanError::InitializationFailed("Missing graphics or present queue".to_string()))?;

        let extensions: Vec<String> = unsafe {
            instance
                .enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        }
        .iter()
        .map(|ext| fixed_name(&ext.extension_name))
        .collect();

        let missing = missing_names(DEVICE_EXTENSIONS, &extensions);
        if !missing.is_empty() {
            return Err(VulkanError::InitializationFailed(format!(
                "Missing device extensions: {}",
                missing.join(", ")
            )));
        }

        // Only meaningful once the swapchain extension is known to exist
        let formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(device, surface)
                .map_err(VulkanError::Api)?
        };
        let present_modes = unsafe {
            surface_loader
                .get_physical_device_surface_present_modes(device, surface)
                .map_err(VulkanError::Api)?
        };
        if formats.is_empty() || present_modes.is_empty() {
            return Err(VulkanError::InitializationFailed(
                "Surface reports no formats or present modes".to_string(),
            ));
        }

        if features.sampler_anisotropy == vk::FALSE {
            return Err(VulkanError::InitializationFailed(
                "Sampler anisotropy not supported".to_string(),
            ));
        }

        Ok(Self {
            device,
            properties,
            features,
            memory_properties,
            queue_families,
        })
    }

    /// Device name as reported by the driver
    pub fn name(&self) -> String {
        fixed_name(&self.properties.device_name)
    }

    /// Largest anisotropy the sampler may request
    pub fn max_sampler_anisotropy(&self) -> f32 {
        self.properties.limits.max_sampler_anisotropy
    }
}

/// Logical device wrapper with RAII cleanup
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create the logical device with one queue per distinct family
    pub fn new(
        instance: &Instance,
        physical_device: &PhysicalDeviceInfo,
        enable_validation: bool,
    ) -> VulkanResult<Self> {
        let priorities = [1.0_f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = physical_device
            .queue_families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extension_names = to_cstrings(DEVICE_EXTENSIONS)?;
        let extension_ptrs: Vec<*const std::os::raw::c_char> =
            extension_names.iter().map(|name| name.as_ptr()).collect();

        // Device layers are ignored by current loaders but older ones still read them
        let layer_names = if enable_validation { to_cstrings(VALIDATION_LAYERS)? } else { Vec::new() };
        let layer_ptrs: Vec<*const std::os::raw::c_char> =
            layer_names.iter().map(|name| name.as_ptr()).collect();

        let device_features = vk::PhysicalDeviceFeatures::builder()
            .sampler_anisotropy(true)
            .build();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_layer_names(&layer_ptrs)
            .enabled_features(&device_features);

        let device = unsafe {
            instance
                .create_device(physical_device.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let families = physical_device.queue_families;
        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        log::debug!(
            "Logical device created (graphics family {}, present family {})",
            families.graphics,
            families.present
        );

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Owner of the instance-level and device-level Vulkan state
pub struct VulkanContext {
    // Drop order: device, physical device info, surface (in Drop), instance
    device: LogicalDevice,
    physical_device: PhysicalDeviceInfo,
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
    // Only held so it is destroyed last
    _instance: VulkanInstance,
}

impl VulkanContext {
    /// Create instance, surface and device for `window`
    pub fn new(window: &mut Window, app_name: &str) -> VulkanResult<Self> {
        Self::with_sink(window, app_name, Box::new(LogSink))
    }

    /// Same as [`VulkanContext::new`] with a custom validation sink
    pub fn with_sink(
        window: &mut Window,
        app_name: &str,
        sink: Box<dyn ValidationSink>,
    ) -> VulkanResult<Self> {
        let instance = VulkanInstance::with_sink(window, app_name, ENABLE_VALIDATION, sink)?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window.create_vulkan_surface(instance.instance.handle())?;

        let selected = PhysicalDeviceInfo::select_suitable_device(&instance.instance, surface, &surface_loader)
            .and_then(|physical_device| {
                LogicalDevice::new(&instance.instance, &physical_device, ENABLE_VALIDATION)
                    .map(|device| (physical_device, device))
            });

        let (physical_device, device) = match selected {
            Ok(pair) => pair,
            Err(e) => {
                unsafe { surface_loader.destroy_surface(surface, None) };
                return Err(e);
            }
        };

        Ok(Self {
            device,
            physical_device,
            surface_loader,
            surface,
            _instance: instance,
        })
    }

    /// Get the surface handle
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface loader
    pub fn surface_loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// Get the physical device info
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Get the logical device
    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    /// Get the raw Device handle
    pub fn raw_device(&self) -> Device {
        self.device.device.clone()
    }

    /// Get the swapchain loader
    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.device.swapchain_loader
    }

    /// Get the graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Selected queue families
    pub fn queue_families(&self) -> QueueFamilies {
        self.physical_device.queue_families
    }

    /// Memory heaps and types of the selected GPU
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.physical_device.memory_properties
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device.device_wait_idle().map_err(VulkanError::Api) }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_names() {
        let available = vec!["VK_LAYER_KHRONOS_validation".to_string(), "VK_LAYER_LUNARG_api_dump".to_string()];
        assert!(missing_names(VALIDATION_LAYERS, &available).is_empty());
        assert_eq!(missing_names(&["VK_KHR_swapchain"], &available), vec!["VK_KHR_swapchain"]);
    }

    #[test]
    fn test_queue_families_shared() {
        let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let found = QueueFamilies::find(&families, |_| Ok(true)).unwrap();

        assert_eq!(found, QueueFamilies { graphics: 0, present: 0 });
        assert!(found.is_shared());
        assert_eq!(found.unique(), vec![0]);
    }

    #[test]
    fn test_queue_families_split() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let found = QueueFamilies::find(&families, |index| Ok(index == 2)).unwrap();

        assert_eq!(found, QueueFamilies { graphics: 1, present: 2 });
        assert!(!found.is_shared());
        assert_eq!(found.unique(), vec![1, 2]);
    }

    #[test]
    fn test_queue_families_missing_present() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        assert!(QueueFamilies::find(&families, |_| Ok(false)).is_none());
        assert!(QueueFamilies::find(&families, |_| Err(VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR))).is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = VulkanError::UnsupportedLayoutTransition {
            old: vk::ImageLayout::UNDEFINED,
            new: vk::ImageLayout::PRESENT_SRC_KHR,
        };
        assert!(err.to_string().contains("UNDEFINED"));

        let err = VulkanError::MissingValidationLayer("VK_LAYER_KHRONOS_validation".to_string());
        assert!(err.to_string().contains("VK_LAYER_KHRONOS_validation"));
    }
}
