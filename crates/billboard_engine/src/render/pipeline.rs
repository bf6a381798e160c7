//! Pipeline variants and their fixed-function state
//!
//! Both pipelines share the vertex shader, vertex layout, depth state and
//! pipeline layout. They differ only in fragment shader and blending, which is
//! all a [`PipelineVariant`] selects.

use ash::vk;

use crate::assets::names;

/// Color blending applied by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Blending disabled; the fragment color replaces the attachment
    Opaque,
    /// Straight (non-premultiplied) alpha: `src * a + dst * (1 - a)`
    StraightAlpha,
}

impl BlendMode {
    /// Color blend attachment state for the single color attachment
    pub fn attachment_state(self) -> vk::PipelineColorBlendAttachmentState {
        let state = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA);

        match self {
            Self::Opaque => state.blend_enable(false).build(),
            Self::StraightAlpha => state
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::ONE)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .alpha_blend_op(vk::BlendOp::ADD)
                .build(),
        }
    }
}

/// The two pipelines drawn each frame, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineVariant {
    /// Ground plane, depth tested and written, no blending
    Opaque,
    /// Sprite, depth tested and written, straight alpha blending
    Alpha,
}

impl PipelineVariant {
    /// Blending for this variant
    pub const fn blend_mode(self) -> BlendMode {
        match self {
            Self::Opaque => BlendMode::Opaque,
            Self::Alpha => BlendMode::StraightAlpha,
        }
    }

    /// Manifest name of the vertex shader
    pub const fn vertex_shader(self) -> &'static str {
        names::SCENE_VERTEX_SHADER
    }

    /// Manifest name of the fragment shader
    pub const fn fragment_shader(self) -> &'static str {
        match self {
            Self::Opaque => names::OPAQUE_FRAGMENT_SHADER,
            Self::Alpha => names::ALPHA_FRAGMENT_SHADER,
        }
    }
}

/// Depth test and write on, `LESS_OR_EQUAL`, no stencil
pub fn depth_stencil_state() -> vk::PipelineDepthStencilStateCreateInfo {
    vk::PipelineDepthStencilStateCreateInfo::builder()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false)
        .build()
}

/// Vertex bindings: positions at 0, texcoords at 1, both per vertex
pub struct SceneVertexLayout;

impl SceneVertexLayout {
    /// Binding descriptions
    pub fn bindings() -> [vk::VertexInputBindingDescription; 2] {
        [
            vk::VertexInputBindingDescription {
                binding: 0,
                stride: 3 * 4,
                input_rate: vk::VertexInputRate::VERTEX,
            },
            vk::VertexInputBindingDescription {
                binding: 1,
                stride: 2 * 4,
                input_rate: vk::VertexInputRate::VERTEX,
            },
        ]
    }

    /// Attribute descriptions; location matches binding
    pub fn attributes() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                binding: 1,
                location: 1,
                format: vk::Format::R32G32_SFLOAT,
                offset: 0,
            },
        ]
    }
}

/// One object per [`PipelineVariant`]
#[derive(Debug)]
pub struct PipelineSet<P> {
    /// Opaque pipeline
    pub opaque: P,
    /// Alpha-blended pipeline
    pub alpha: P,
}

impl<P> PipelineSet<P> {
    /// Build both variants with `build`, opaque first
    pub fn try_build<E>(mut build: impl FnMut(PipelineVariant) -> Result<P, E>) -> Result<Self, E> {
        Ok(Self {
            opaque: build(PipelineVariant::Opaque)?,
            alpha: build(PipelineVariant::Alpha)?,
        })
    }

    /// Object for `variant`
    pub const fn get(&self, variant: PipelineVariant) -> &P {
        match variant {
            PipelineVariant::Opaque => &self.opaque,
            PipelineVariant::Alpha => &self.alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_does_not_blend() {
        let state = BlendMode::Opaque.attachment_state();
        assert_eq!(state.blend_enable, vk::FALSE);
        assert_eq!(state.color_write_mask, vk::ColorComponentFlags::RGBA);
    }

    #[test]
    fn test_alpha_is_straight_over() {
        let state = PipelineVariant::Alpha.blend_mode().attachment_state();
        assert_eq!(state.blend_enable, vk::TRUE);
        assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
        assert_eq!(state.color_blend_op, vk::BlendOp::ADD);
    }

    #[test]
    fn test_both_variants_share_vertex_shader() {
        assert_eq!(
            PipelineVariant::Opaque.vertex_shader(),
            PipelineVariant::Alpha.vertex_shader()
        );
        assert_ne!(
            PipelineVariant::Opaque.fragment_shader(),
            PipelineVariant::Alpha.fragment_shader()
        );
    }

    #[test]
    fn test_depth_state() {
        let depth = depth_stencil_state();
        assert_eq!(depth.depth_test_enable, vk::TRUE);
        assert_eq!(depth.depth_write_enable, vk::TRUE);
        assert_eq!(depth.depth_compare_op, vk::CompareOp::LESS_OR_EQUAL);
    }

    #[test]
    fn test_vertex_layout_contract() {
        let bindings = SceneVertexLayout::bindings();
        let attributes = SceneVertexLayout::attributes();

        assert_eq!(bindings[0].stride, 12);
        assert_eq!(bindings[1].stride, 8);
        assert_eq!(attributes[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attributes[1].format, vk::Format::R32G32_SFLOAT);
        assert!(bindings.iter().all(|b| b.input_rate == vk::VertexInputRate::VERTEX));
    }

    #[test]
    fn test_try_build_stops_at_first_error() {
        let mut built = Vec::new();
        let result: Result<PipelineSet<u32>, &str> = PipelineSet::try_build(|variant| {
            built.push(variant);
            Err("boom")
        });

        assert!(result.is_err());
        assert_eq!(built, vec![PipelineVariant::Opaque]);
    }

    #[test]
    fn test_get_selects_the_variant_built_for_it() {
        let set: Result<PipelineSet<PipelineVariant>, ()> = PipelineSet::try_build(Ok);
        let set = set.unwrap();

        assert_eq!(*set.get(PipelineVariant::Opaque), PipelineVariant::Opaque);
        assert_eq!(*set.get(PipelineVariant::Alpha), PipelineVariant::Alpha);
    }
}
