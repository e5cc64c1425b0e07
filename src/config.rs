use winit::dpi::LogicalSize;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub initial_size: LogicalSize<u32>,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Indexed Quad".to_string(),
            initial_size: LogicalSize::new(800, 600),
            resizable: true,
        }
    }
}

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    /// Either low power or high performance.
    pub power_preference: wgpu::PowerPreference,

    /// Present mode (swap behavior). FIFO waits for vertical blank and is
    /// supported everywhere; unsupported modes fall back to the surface's first.
    pub present_mode: wgpu::PresentMode,

    /// Pick an sRGB surface format when one is available.
    ///
    /// Off by default: the clear and fragment colors are meant to land in the
    /// framebuffer as written, without a linear-to-sRGB conversion.
    pub prefer_srgb: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            present_mode: wgpu::PresentMode::Fifo,
            prefer_srgb: false,
        }
    }
}
