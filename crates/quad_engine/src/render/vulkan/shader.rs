//! Shader management and pipeline creation
//!
//! SPIR-V loading and the one graphics pipeline the quad is drawn with

use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use ash::{vk, Device};

use super::context::{VulkanError, VulkanResult};
use super::vertex_layout::VulkanVertexLayout;
use crate::core::config::ShaderConfig;

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

const ENTRY_POINT: &[u8] = b"main\0";

/// Decode a SPIR-V blob into words, checking length and magic number
pub fn parse_spirv(bytes: &[u8]) -> VulkanResult<Vec<u32>> {
    let words = ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| VulkanError::InitializationFailed(format!("Invalid SPIR-V: {e}")))?;

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        _ => Err(VulkanError::InitializationFailed("Invalid SPIR-V: bad magic number".to_string())),
    }
}

/// Vertex and fragment SPIR-V, loaded before any device exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBytecode {
    /// Vertex stage words
    pub vertex: Vec<u32>,
    /// Fragment stage words
    pub fragment: Vec<u32>,
}

impl ShaderBytecode {
    /// Read both stages from the configured paths
    pub fn load(config: &ShaderConfig) -> VulkanResult<Self> {
        Ok(Self {
            vertex: Self::read(&config.vertex_shader_path)?,
            fragment: Self::read(&config.fragment_shader_path)?,
        })
    }

    /// Decode both stages from in-memory blobs
    pub fn from_bytes(vertex: &[u8], fragment: &[u8]) -> VulkanResult<Self> {
        Ok(Self {
            vertex: parse_spirv(vertex)?,
            fragment: parse_spirv(fragment)?,
        })
    }

    fn read(path: impl AsRef<Path>) -> VulkanResult<Vec<u32>> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to read shader {}: {e}", path.display()))
        })?;
        log::debug!("Loaded shader {} ({} bytes)", path.display(), bytes.len());
        parse_spirv(&bytes)
    }
}

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create shader module from SPIR-V words
    pub fn from_words(device: Device, words: &[u32]) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);

        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Create shader stage create info
    pub fn create_stage_info(&self, stage: vk::ShaderStageFlags, entry_point: &CStr) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Pipeline state recorded per frame instead of baked in
pub const DYNAMIC_STATES: [vk::DynamicState; 2] = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];

/// Graphics pipeline wrapper with RAII cleanup
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build the quad pipeline for `render_pass`
    ///
    /// Viewport and scissor are dynamic, so the pipeline survives swapchain
    /// resizes and only depends on the render pass.
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        shaders: &ShaderBytecode,
        descriptor_set_layout: vk::DescriptorSetLayout,
    ) -> VulkanResult<Self> {
        // Modules are only needed until the pipeline exists
        let vertex_shader = ShaderModule::from_words(device.clone(), &shaders.vertex)?;
        let fragment_shader = ShaderModule::from_words(device.clone(), &shaders.fragment)?;

        let entry = CStr::from_bytes_with_nul(ENTRY_POINT)
            .map_err(|e| VulkanError::InitializationFailed(format!("Bad entry point: {e}")))?;
        let shader_stages = [
            vertex_shader.create_stage_info(vk::ShaderStageFlags::VERTEX, entry),
            fragment_shader.create_stage_info(vk::ShaderStageFlags::FRAGMENT, entry),
        ];

        let bindings = [VulkanVertexLayout::binding_description()];
        let attributes = VulkanVertexLayout::attribute_descriptions();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            // The projection flips Y, which turns the quad's winding counter-clockwise
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();
        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&DYNAMIC_STATES);

        let set_layouts = [descriptor_set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder().set_layouts(&set_layouts);
        let layout = unsafe {
            device
                .create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines.into_iter().next().unwrap_or_default(),
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };

        log::debug!("Graphics pipeline created");

        Ok(Self {
            device,
            pipeline,
            layout,
        })
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_to_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    #[test]
    fn test_parse_spirv_accepts_magic() {
        let bytes = words_to_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]);
        let words = parse_spirv(&bytes).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
    }

    #[test]
    fn test_parse_spirv_rejects_garbage() {
        assert!(parse_spirv(&[1, 2, 3]).is_err());
        assert!(parse_spirv(&words_to_bytes(&[0xDEAD_BEEF, 0])).is_err());
        assert!(parse_spirv(&[]).is_err());
    }

    #[test]
    fn test_bytecode_from_in_memory_blobs() {
        let vertex = words_to_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 8, 0]);
        let fragment = words_to_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 4, 0, 0]);

        let shaders = ShaderBytecode::from_bytes(&vertex, &fragment).unwrap();
        assert_eq!(shaders.vertex.len(), 5);
        assert_eq!(shaders.fragment.len(), 6);
        assert!(ShaderBytecode::from_bytes(&vertex, &[0xAB; 8]).is_err());
    }

    #[test]
    fn test_missing_shader_file_is_an_error() {
        let config = ShaderConfig::new("no/such/shader.vert.spv", "no/such/shader.frag.spv");
        let err = ShaderBytecode::load(&config).unwrap_err();
        assert!(err.to_string().contains("shader.vert.spv"));
    }

    #[test]
    fn test_viewport_and_scissor_are_dynamic() {
        assert!(DYNAMIC_STATES.contains(&vk::DynamicState::VIEWPORT));
        assert!(DYNAMIC_STATES.contains(&vk::DynamicState::SCISSOR));
    }
}
