use anyhow::Result;

use crate::error::Error;

/// One resource written into a bind group slot.
#[derive(Clone, Copy, Debug)]
pub enum DescriptorInfo<'a> {
    Buffer {
        buffer: &'a wgpu::Buffer,
        offset: wgpu::BufferAddress,
        size: Option<wgpu::BufferSize>,
    },
    #[allow(dead_code)]
    TextureView(&'a wgpu::TextureView),
    #[allow(dead_code)]
    Sampler(&'a wgpu::Sampler),
}

impl<'a> DescriptorInfo<'a> {
    pub fn buffer(buffer: &'a wgpu::Buffer) -> Self {
        Self::Buffer {
            buffer,
            offset: 0,
            size: None,
        }
    }

    #[allow(dead_code)]
    pub fn texture_view(texture_view: &'a wgpu::TextureView) -> Self {
        Self::TextureView(texture_view)
    }

    #[allow(dead_code)]
    pub fn sampler(sampler: &'a wgpu::Sampler) -> Self {
        Self::Sampler(sampler)
    }

    fn binding_resource(self) -> wgpu::BindingResource<'a> {
        match self {
            Self::Buffer {
                buffer,
                offset,
                size,
            } => wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset,
                size,
            }),
            Self::TextureView(texture_view) => wgpu::BindingResource::TextureView(texture_view),
            Self::Sampler(sampler) => wgpu::BindingResource::Sampler(sampler),
        }
    }
}

/// Maps a flat descriptor slice onto bindings: entry `k` takes descriptor `k`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DescriptorUpdateTemplate {
    bindings: Vec<u32>,
}

impl DescriptorUpdateTemplate {
    pub fn from_binding_mask(mask: u32) -> Self {
        Self {
            bindings: (0..u32::BITS)
                .filter(|binding| mask & (1 << binding) != 0)
                .collect(),
        }
    }

    pub fn bindings(&self) -> &[u32] {
        &self.bindings
    }

    pub fn create_bind_group(
        &self,
        label: &str,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        descriptors: &[DescriptorInfo],
    ) -> Result<wgpu::BindGroup> {
        let entries = self.bind_group_entries(descriptors)?;

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &entries,
        }))
    }

    fn bind_group_entries<'a>(
        &self,
        descriptors: &[DescriptorInfo<'a>],
    ) -> Result<Vec<wgpu::BindGroupEntry<'a>>> {
        if descriptors.len() != self.bindings.len() {
            return Err(Error::new(format!(
                "Descriptor update template expects {} descriptors for bindings {:?}, got {}",
                self.bindings.len(),
                self.bindings(),
                descriptors.len()
            ))
            .into());
        }

        Ok(self
            .bindings
            .iter()
            .zip(descriptors)
            .map(|(&binding, descriptor)| wgpu::BindGroupEntry {
                binding,
                resource: descriptor.binding_resource(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_lists_bindings_in_ascending_order() {
        let template = DescriptorUpdateTemplate::from_binding_mask(0b1000_0000_0000_0000_0000_0000_0010_0101);

        assert_eq!(template.bindings(), &[0, 2, 5, 31]);
    }

    #[test]
    fn empty_mask_has_no_entries() {
        let template = DescriptorUpdateTemplate::from_binding_mask(0);

        assert!(template.bindings().is_empty());
        assert!(template.bind_group_entries(&[]).unwrap().is_empty());
    }

    #[test]
    fn descriptor_count_must_match_template() {
        let template = DescriptorUpdateTemplate::from_binding_mask(0b11);

        assert!(template.bind_group_entries(&[]).is_err());
    }

    #[test]
    fn count_mismatch_names_the_expected_bindings() {
        let template = DescriptorUpdateTemplate::from_binding_mask(0b101);

        let error = template.bind_group_entries(&[]).unwrap_err();

        assert_eq!(
            error.to_string(),
            "Descriptor update template expects 2 descriptors for bindings [0, 2], got 0"
        );
    }
}
