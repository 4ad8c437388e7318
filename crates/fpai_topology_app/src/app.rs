// SPDX-License-Identifier: MIT OR Apache-2.0
//! Main dashboard application setup and event loop.

use crate::panel_types::PanelType;
use crate::panels::DetailsPanel;
use egui_dock::{DockArea, DockState, NodeIndex, Style, TabViewer};
use egui_wgpu::wgpu;
use fpai_topology_graph::port::PortRef;
use fpai_topology_graph::ui::{ConnectionEditorUi, TopologyViewerUi};
use fpai_topology_sync::{
    ConfigError, HttpTransport, PollPolicy, PortCommand, Poller, SharedStatus, SyncClient, SyncConfig,
    Topology, TransportError,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Dashboard application errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Window creation failed
    #[error("Failed to create window: {0}")]
    WindowCreation(String),

    /// Renderer initialization failed
    #[error("Failed to initialize renderer: {0}")]
    RendererInit(String),

    /// Event loop error
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Async runtime could not be started
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// Sync configuration is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport could not be built
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for dashboard operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Tab viewer implementation for `egui_dock`
struct TopologyTabViewer<'a> {
    topology: &'a mut Topology,
    viewer_ui: &'a mut TopologyViewerUi,
    editor_ui: &'a mut ConnectionEditorUi,
    details: &'a mut DetailsPanel,
}

impl<'a> TabViewer for TopologyTabViewer<'a> {
    type Tab = PanelType;

    fn title(&mut self, tab: &mut Self::Tab) -> egui::WidgetText {
        format!("{} {}", tab.icon(), tab.name()).into()
    }

    fn ui(&mut self, ui: &mut egui::Ui, tab: &mut Self::Tab) {
        match tab {
            PanelType::TopologyViewer => {
                self.viewer_ui.ui(ui, self.topology.viewer_mut());
                for event in self.topology.viewer_mut().take_events() {
                    self.details.on_selection(event);
                }
            }
            PanelType::ConnectionEditor => self.editor_ui.ui(ui, self.topology.editor_mut()),
            PanelType::Details => self.details.ui(ui, self.topology),
        }
    }

    fn closeable(&mut self, _tab: &mut Self::Tab) -> bool {
        false
    }
}

/// Graphics state for wgpu rendering
struct GraphicsState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    egui_renderer: egui_wgpu::Renderer,
}

impl GraphicsState {
    fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        // Create surface
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| AppError::RendererInit(e.to_string()))?;

        // Request adapter
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| AppError::RendererInit("no suitable GPU adapter".to_string()))?;

        tracing::info!(adapter = %adapter.get_info().name, "using GPU");

        // Request device
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("FPAI Topology Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .map_err(|e| AppError::RendererInit(e.to_string()))?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| AppError::RendererInit("surface has no formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Create egui renderer
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            egui_renderer,
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    #[allow(unsafe_code)] // Workaround for wgpu 23 lifetime issue with RenderPass
    fn render(
        &mut self,
        egui_ctx: &egui::Context,
        full_output: egui::FullOutput,
        window: &Window,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Dashboard Encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        // egui_wgpu::Renderer::render wants a RenderPass<'static>
        let encoder_ptr = Box::into_raw(Box::new(encoder));

        {
            // SAFETY: encoder_ptr is valid and is reclaimed only after render_pass is dropped
            let encoder_ref: &'static mut wgpu::CommandEncoder = unsafe { &mut *encoder_ptr };

            let mut render_pass = encoder_ref.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Dashboard Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        // SAFETY: render_pass holding the borrow has been dropped
        let encoder = unsafe { Box::from_raw(encoder_ptr) };

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        Ok(())
    }
}

/// Running state of the dashboard
struct DashboardRunning {
    window: Arc<Window>,
    graphics: GraphicsState,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
}

/// Dashboard state and panels
struct DashboardInner {
    topology: Topology,
    client: SyncClient,
    status: SharedStatus,
    runtime: tokio::runtime::Handle,
    dock_state: DockState<PanelType>,
    viewer_ui: TopologyViewerUi,
    editor_ui: ConnectionEditorUi,
    details: DetailsPanel,
}

impl DashboardInner {
    fn new(config: &SyncConfig, runtime: tokio::runtime::Handle) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        let (client, events) = SyncClient::new(Arc::new(transport));
        let poller = Poller::spawn_on(&runtime, client.clone(), PollPolicy::from_config(config));

        let mut topology = Topology::new();
        topology.init(events, Some(poller));

        Ok(Self {
            topology,
            status: client.status(),
            client,
            runtime,
            dock_state: Self::create_default_layout(),
            viewer_ui: TopologyViewerUi::new(),
            editor_ui: ConnectionEditorUi::new(),
            details: DetailsPanel::new(),
        })
    }

    fn create_default_layout() -> DockState<PanelType> {
        // Viewer and editor share the center
        let mut dock_state = DockState::new(vec![PanelType::TopologyViewer, PanelType::ConnectionEditor]);

        let surface = dock_state.main_surface_mut();
        let [_center, _right] = surface.split_right(NodeIndex::root(), 0.75, vec![PanelType::Details]);

        dock_state
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(task);
    }

    fn send_command(&self, command: PortCommand, source: PortRef, target: PortRef) {
        let client = self.client.clone();
        self.spawn(async move {
            // Outcome arrives as a sync event
            let _ = client.send_port_command(command, &source, &target).await;
        });
    }

    fn update(&mut self, ctx: &egui::Context) {
        self.topology.pump();
        for request in self.topology.take_connect_requests() {
            self.send_command(PortCommand::Connect, request.source, request.target);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| self.toolbar(ui));
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| self.status_bar(ui));
        });

        let mut tab_viewer = TopologyTabViewer {
            topology: &mut self.topology,
            viewer_ui: &mut self.viewer_ui,
            editor_ui: &mut self.editor_ui,
            details: &mut self.details,
        };

        DockArea::new(&mut self.dock_state)
            .style(Style::from_egui(ctx.style().as_ref()))
            .show(ctx, &mut tab_viewer);
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        if ui.button("\u{21bb} Refresh").clicked() {
            let client = self.client.clone();
            self.spawn(async move {
                let _ = client.refresh_all().await;
            });
        }

        if ui.button("Autoconnect").clicked() {
            tracing::info!("autoconnecting");
            let client = self.client.clone();
            self.spawn(async move {
                let _ = client.autoconnect().await;
            });
        }

        if ui.button("Auto layout").clicked() {
            self.topology.editor_mut().relayout();
        }

        ui.separator();

        let actions = self.topology.viewer().actions();
        let ports = self.topology.selected_edge_ports();

        if ui
            .add_enabled(actions.connect && ports.is_some(), egui::Button::new("Connect"))
            .clicked()
        {
            if let Some((source, target)) = ports.clone() {
                self.send_command(PortCommand::Connect, source, target);
            }
        }

        if ui
            .add_enabled(actions.disconnect && ports.is_some(), egui::Button::new("Disconnect"))
            .clicked()
        {
            if let Some((source, target)) = ports {
                self.send_command(PortCommand::Disconnect, source, target);
            }
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        let status = self.status.read().clone();

        if status.is_healthy() {
            ui.label(egui::RichText::new("\u{25cf} Online").color(egui::Color32::from_rgb(122, 193, 3)));
            if let Some(at) = status.last_success {
                ui.label(format!("updated {:.0}s ago", at.elapsed().as_secs_f32()));
            }
        } else {
            ui.label(egui::RichText::new("\u{25cf} Offline").color(egui::Color32::from_rgb(220, 40, 40)));
            ui.label(format!("{} failed attempts", status.consecutive_failures));
        }

        if let Some(error) = self.topology.last_error() {
            ui.separator();
            ui.label(egui::RichText::new(error).color(egui::Color32::YELLOW));
        }
    }
}

/// Main dashboard application
pub struct TopologyApp {
    runtime: tokio::runtime::Runtime,
    dashboard: DashboardInner,
    running: Option<DashboardRunning>,
    error: Option<AppError>,
}

impl TopologyApp {
    /// Create the dashboard and start polling the server
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("fpai-sync")
            .enable_all()
            .build()?;
        let dashboard = DashboardInner::new(config, runtime.handle().clone())?;

        Ok(Self {
            runtime,
            dashboard,
            running: None,
            error: None,
        })
    }

    /// Run the dashboard until its window is closed
    pub fn run(config: &SyncConfig) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = TopologyApp::new(config)?;
        event_loop.run_app(&mut app)?;

        app.dashboard.topology.dispose();
        app.runtime.shutdown_background();

        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start(&self, event_loop: &ActiveEventLoop) -> Result<DashboardRunning> {
        let window_attrs = Window::default_attributes()
            .with_title("FPAI Connection Topology")
            .with_inner_size(winit::dpi::LogicalSize::new(1400, 850))
            .with_min_inner_size(winit::dpi::LogicalSize::new(800, 600));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|e| AppError::WindowCreation(e.to_string()))?,
        );

        let graphics = GraphicsState::new(window.clone())?;
        let egui_ctx = egui::Context::default();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2 * 1024), // max texture side
        );

        tracing::info!(size = ?window.inner_size(), "dashboard window ready");

        Ok(DashboardRunning {
            window,
            graphics,
            egui_ctx,
            egui_state,
        })
    }
}

impl ApplicationHandler for TopologyApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(running) => self.running = Some(running),
            Err(e) => {
                tracing::error!(error = %e, "failed to start dashboard");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(running) = &mut self.running else {
            return;
        };

        let response = running.egui_state.on_window_event(&running.window, &event);

        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                tracing::debug!(?new_size, "window resized");
                running.graphics.resize(new_size);
                running.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let dashboard = &mut self.dashboard;
                let raw_input = running.egui_state.take_egui_input(&running.window);
                let full_output = running.egui_ctx.run(raw_input, |ctx| {
                    dashboard.update(ctx);
                });

                running
                    .egui_state
                    .handle_platform_output(&running.window, full_output.platform_output.clone());

                match running.graphics.render(&running.egui_ctx, full_output, &running.window) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = running.window.inner_size();
                        running.graphics.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("out of GPU memory");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("surface timeout");
                    }
                }

                running.window.request_redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(running) = &self.running {
            running.window.request_redraw();
        }
    }
}
