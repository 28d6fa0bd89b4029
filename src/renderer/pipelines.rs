// SPDX-License-Identifier: GPL-3.0-only

//! Preprocess and render pipelines with explicitly declared bind group layouts
//!
//! Layouts are built up front and shared, so bind groups can be created in any
//! order and do not depend on shader reflection.

use crate::gpu::wgpu;
use crate::point_cloud::PointCloud;
use crate::shaders::gpu_utils::{create_buffer_bind_group, storage_entry, uniform_entry};
use crate::shaders::{preprocess_constants, preprocess_shader, render_shader};
use crate::sort::RadixSorter;

/// Bind group layouts for every set either pipeline uses.
pub struct BindGroupLayouts {
    /// Set 0 of both pipelines
    pub camera: wgpu::BindGroupLayout,
    /// Preprocess set 1: points, splats, settings
    pub gaussians: wgpu::BindGroupLayout,
    /// Preprocess set 2: counter, keys, indices, sort dispatch
    pub sort: wgpu::BindGroupLayout,
    /// Render set 1: splats, sorted indices
    pub splats: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let compute = wgpu::ShaderStages::COMPUTE;

        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::COMPUTE | wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });

        let gaussians = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("preprocess_gaussian_bind_group_layout"),
            entries: &[
                storage_entry(0, compute, true),
                storage_entry(1, compute, false),
                uniform_entry(2, compute),
            ],
        });

        let sort = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("preprocess_sort_bind_group_layout"),
            entries: &[
                storage_entry(0, compute, false),
                storage_entry(1, compute, false),
                storage_entry(2, compute, false),
                storage_entry(3, compute, false),
            ],
        });

        let splats = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("render_splat_bind_group_layout"),
            entries: &[
                storage_entry(0, wgpu::ShaderStages::VERTEX, true),
                storage_entry(1, wgpu::ShaderStages::VERTEX, true),
            ],
        });

        Self {
            camera,
            gaussians,
            sort,
            splats,
        }
    }

    pub fn camera_bind_group(
        &self,
        device: &wgpu::Device,
        camera_buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        create_buffer_bind_group(device, "camera_bind_group", &self.camera, &[camera_buffer])
    }
}

/// Compute pipeline running the `preprocess` entry point.
pub struct PreprocessPipeline {
    pipeline: wgpu::ComputePipeline,
    gaussian_bind_group: wgpu::BindGroup,
    sort_bind_group: wgpu::BindGroup,
}

impl PreprocessPipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        point_cloud: &PointCloud,
        splats: &wgpu::Buffer,
        settings: &wgpu::Buffer,
        sorter: &RadixSorter,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("preprocess_shader"),
            source: wgpu::ShaderSource::Wgsl(preprocess_shader().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("preprocess_pipeline_layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.gaussians, &layouts.sort],
            push_constant_ranges: &[],
        });

        let constants = preprocess_constants();
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("preprocess_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("preprocess"),
            compilation_options: wgpu::PipelineCompilationOptions {
                constants: &constants,
                ..Default::default()
            },
            cache: None,
        });

        let gaussian_bind_group = create_buffer_bind_group(
            device,
            "preprocess_gaussian_bind_group",
            &layouts.gaussians,
            &[point_cloud.buffer(), splats, settings],
        );

        let slot = sorter.current();
        let sort_bind_group = create_buffer_bind_group(
            device,
            "preprocess_sort_bind_group",
            &layouts.sort,
            &[
                sorter.sort_info_buffer(),
                &slot.keys,
                &slot.indices,
                sorter.dispatch_indirect_buffer(),
            ],
        );

        Self {
            pipeline,
            gaussian_bind_group,
            sort_bind_group,
        }
    }

    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        camera_bind_group: &wgpu::BindGroup,
        workgroups: u32,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("preprocess_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_bind_group(1, &self.gaussian_bind_group, &[]);
        pass.set_bind_group(2, &self.sort_bind_group, &[]);
        pass.dispatch_workgroups(workgroups, 1, 1);
    }
}

/// Graphics pipeline drawing one quad per sorted splat.
pub struct SplatRenderPipeline {
    pipeline: wgpu::RenderPipeline,
    splat_bind_group: wgpu::BindGroup,
}

impl SplatRenderPipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        format: wgpu::TextureFormat,
        splats: &wgpu::Buffer,
        sorter: &RadixSorter,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gaussian_render_shader"),
            source: wgpu::ShaderSource::Wgsl(render_shader().into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gaussian_render_pipeline_layout"),
            bind_group_layouts: &[&layouts.camera, &layouts.splats],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gaussian_render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    // Back-to-front "over" with premultiplied color
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let splat_bind_group = create_buffer_bind_group(
            device,
            "render_splat_bind_group",
            &layouts.splats,
            &[splats, &sorter.current().indices],
        );

        Self {
            pipeline,
            splat_bind_group,
        }
    }

    pub fn record(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        draw_indirect: &wgpu::Buffer,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind_group, &[]);
        pass.set_bind_group(1, &self.splat_bind_group, &[]);
        pass.draw_indirect(draw_indirect, 0);
    }
}
