// GPU-batched evaluation of the Gaussian kernel density estimate.
// This module is only included when the `gpu_support` feature flag is enabled

use bytemuck::{Pod, Zeroable};
use futures_intrusive::channel::shared::oneshot_channel;
use pollster::block_on;
use wgpu::util::DeviceExt;

use crate::error::{LoopTeError, Result};
use crate::estimators::approaches::kernel::GaussianKde;

/// Largest dimensionality the shader handles (one `vec4<f32>` per point).
const MAX_GPU_DIMS: usize = 4;

// Whitened point padded to four lanes; unused lanes stay zero for samples
// and queries alike so they never contribute to the distance.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuPoint {
    values: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct GpuConfig {
    sample_count: u32,
    query_count: u32,
    _padding: [u32; 2], // Padding to ensure 16-byte alignment
}

impl<const K: usize> GaussianKde<K> {
    /// Evaluates the density at every query point in a single compute dispatch.
    ///
    /// Samples and queries are whitened on the CPU in double precision, so the
    /// shader only sums `exp(-½‖q - z‖²)` with Kahan compensation. The
    /// normalisation is applied afterwards in `f64`.
    ///
    /// Fails if K exceeds four dimensions, no adapter is available, or any
    /// step of the dispatch fails.
    pub fn evaluate_many_gpu(&self, queries: &[[f64; K]]) -> Result<Vec<f64>> {
        if K > MAX_GPU_DIMS {
            return Err(LoopTeError::Gpu(format!(
                "gpu evaluation supports up to {MAX_GPU_DIMS} dimensions, got {K}"
            )));
        }
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        let sums = self
            .run_gaussian_gpu_calculation(queries)
            .map_err(|e| LoopTeError::Gpu(e.to_string()))?;
        Ok(sums
            .into_iter()
            .map(|s| s as f64 / self.normalization)
            .collect())
    }

    fn to_gpu_point(&self, p: &[f64; K]) -> GpuPoint {
        let z = self.whiten(p);
        let mut gpu_point = GpuPoint { values: [0.0; 4] };
        for (i, &val) in z.iter().enumerate() {
            gpu_point.values[i] = val as f32;
        }
        gpu_point
    }

    fn run_gaussian_gpu_calculation(
        &self,
        queries: &[[f64; K]],
    ) -> std::result::Result<Vec<f32>, Box<dyn std::error::Error>> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = match block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })) {
            Ok(adapter) => adapter,
            Err(_) => return Err("Failed to find an appropriate adapter".into()),
        };

        let (device, queue) = block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Gaussian KDE Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))?;

        let gpu_samples: Vec<GpuPoint> =
            self.data.points.iter().map(|p| self.to_gpu_point(p)).collect();
        let gpu_queries: Vec<GpuPoint> = queries.iter().map(|q| self.to_gpu_point(q)).collect();

        let gpu_config = GpuConfig {
            sample_count: gpu_samples.len() as u32,
            query_count: gpu_queries.len() as u32,
            _padding: [0; 2],
        };

        let samples_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Samples Buffer"),
            contents: bytemuck::cast_slice(&gpu_samples),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let queries_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Queries Buffer"),
            contents: bytemuck::cast_slice(&gpu_queries),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let config_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Config Buffer"),
            contents: bytemuck::bytes_of(&gpu_config),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let output_size = (gpu_queries.len() * std::mem::size_of::<f32>()) as u64;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Gaussian KDE Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("gaussian_kde.wgsl").into()),
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Gaussian KDE Bind Group Layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(3, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Gaussian KDE Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Gaussian KDE Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Gaussian KDE Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: samples_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: queries_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: config_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: output_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Gaussian KDE Command Encoder"),
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Gaussian KDE Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&compute_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);

            // 256 threads per workgroup, one query per thread
            let workgroup_size = 256;
            let workgroup_count = (gpu_queries.len() as u32).div_ceil(workgroup_size);
            compute_pass.dispatch_workgroups(workgroup_count, 1, 1);
        }

        encoder.copy_buffer_to_buffer(&output_buffer, 0, &staging_buffer, 0, output_size);
        queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = sender.send(v);
        });

        device.poll(wgpu::PollType::Wait)?;

        if let Some(Ok(())) = block_on(receiver.receive()) {
            let data = buffer_slice.get_mapped_range();
            let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
            drop(data);
            staging_buffer.unmap();
            Ok(result)
        } else {
            Err("Failed to read back results from GPU".into())
        }
    }
}
