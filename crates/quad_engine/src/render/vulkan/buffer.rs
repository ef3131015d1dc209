//! Buffer management for vertex data and uniforms
//!
//! Memory management following RAII patterns with proper allocation and cleanup.
//! Static geometry goes through a host-visible staging buffer into
//! device-local memory; uniform buffers stay host-visible and mapped.

use std::marker::PhantomData;
use std::mem;

use ash::{vk, Device};
use bytemuck::Pod;

use super::commands::CommandPool;
use super::context::{VulkanError, VulkanResult};

/// Host-visible, host-coherent memory for CPU writes without flushes
pub const HOST_VISIBLE_COHERENT: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Index of the first memory type allowed by `type_filter` that has every flag in `properties`
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let count = memory_properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count)
        .find(|&i| {
            type_filter & (1 << i) != 0
                && memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType {
            type_filter,
            properties,
        })
}

/// Allocate and bind device memory that satisfies `requirements`
pub fn allocate_memory(
    device: &Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<vk::DeviceMemory> {
    let memory_type_index = find_memory_type(memory_properties, requirements.memory_type_bits, properties)?;

    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api) }
}

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = match allocate_memory(&device, memory_properties, requirements, properties) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // From here on Drop releases both handles
        let created = Self {
            device,
            buffer,
            memory,
            size,
        };

        unsafe {
            created
                .device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Ok(created)
    }

    /// Host-visible staging buffer holding `data`
    pub fn staging<T: Pod>(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        data: &[T],
    ) -> VulkanResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(
            device,
            memory_properties,
            bytes.len() as vk::DeviceSize,
            vk::BufferUsageFlags::TRANSFER_SRC,
            HOST_VISIBLE_COHERENT,
        )?;
        buffer.write_data(data)?;
        Ok(buffer)
    }

    /// Device-local buffer filled with `data` through a staging copy
    pub fn device_local_with_data<T: Pod>(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let staging = Self::staging(device.clone(), memory_properties, data)?;
        let buffer = Self::new(
            device,
            memory_properties,
            staging.size(),
            usage | vk::BufferUsageFlags::TRANSFER_DST,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        copy_buffer(command_pool, queue, staging.handle(), buffer.handle(), staging.size())?;
        Ok(buffer)
    }

    /// Map memory for writing
    pub fn map_memory(&self) -> VulkanResult<*mut std::ffi::c_void> {
        unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Unmap memory
    pub fn unmap_memory(&self) {
        unsafe {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Write data to buffer
    pub fn write_data<T: Pod>(&self, data: &[T]) -> VulkanResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} bytes do not fit a {} byte buffer", bytes.len(), self.size),
            });
        }

        let data_ptr = self.map_memory()?;
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr.cast::<u8>(), bytes.len());
        }
        self.unmap_memory();
        Ok(())
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Copy `size` bytes between buffers on `queue`, waiting for completion
pub fn copy_buffer(
    command_pool: &CommandPool,
    queue: vk::Queue,
    src: vk::Buffer,
    dst: vk::Buffer,
    size: vk::DeviceSize,
) -> VulkanResult<()> {
    command_pool.run_single_time(queue, |device, command_buffer| {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            device.cmd_copy_buffer(command_buffer, src, dst, &[region]);
        }
    })
}

/// Uniform buffer that stays mapped for its whole life
pub struct MappedUniformBuffer<T: Pod> {
    buffer: Buffer,
    mapped: *mut T,
    _marker: PhantomData<T>,
}

impl<T: Pod> MappedUniformBuffer<T> {
    /// Create and map a host-coherent buffer sized for one `T`
    pub fn new(device: Device, memory_properties: &vk::PhysicalDeviceMemoryProperties) -> VulkanResult<Self> {
        let buffer = Buffer::new(
            device,
            memory_properties,
            mem::size_of::<T>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            HOST_VISIBLE_COHERENT,
        )?;
        let mapped = buffer.map_memory()?.cast::<T>();

        Ok(Self {
            buffer,
            mapped,
            _marker: PhantomData,
        })
    }

    /// Overwrite the buffer contents
    ///
    /// The caller must know the GPU is not reading this buffer, which the
    /// owning slot's fence guarantees.
    pub fn write(&mut self, value: &T) {
        unsafe {
            self.mapped.write_unaligned(*value);
        }
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer.handle()
    }

    /// Size of one `T`
    pub fn range(&self) -> vk::DeviceSize {
        mem::size_of::<T>() as vk::DeviceSize
    }
}

impl<T: Pod> Drop for MappedUniformBuffer<T> {
    fn drop(&mut self) {
        self.buffer.unmap_memory();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in properties.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        properties
    }

    #[test]
    fn test_find_memory_type_matches_filter_and_flags() {
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            HOST_VISIBLE_COHERENT,
            HOST_VISIBLE_COHERENT | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);

        assert_eq!(find_memory_type(&properties, 0b111, HOST_VISIBLE_COHERENT).unwrap(), 1);
        // Type 1 excluded by the filter, type 2 is a superset
        assert_eq!(find_memory_type(&properties, 0b101, HOST_VISIBLE_COHERENT).unwrap(), 2);
        assert_eq!(
            find_memory_type(&properties, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(),
            0
        );
    }

    #[test]
    fn test_find_memory_type_fails_without_match() {
        let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);

        let result = find_memory_type(&properties, 0b1, HOST_VISIBLE_COHERENT);
        assert!(matches!(
            result,
            Err(VulkanError::NoSuitableMemoryType { type_filter: 0b1, .. })
        ));

        // Right flags but filtered out
        let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, HOST_VISIBLE_COHERENT]);
        assert!(find_memory_type(&properties, 0b1, HOST_VISIBLE_COHERENT).is_err());
    }

    #[test]
    fn test_host_visible_coherent_flags() {
        assert!(HOST_VISIBLE_COHERENT.contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
        assert!(HOST_VISIBLE_COHERENT.contains(vk::MemoryPropertyFlags::HOST_COHERENT));
        assert!(!HOST_VISIBLE_COHERENT.contains(vk::MemoryPropertyFlags::DEVICE_LOCAL));
    }
}
