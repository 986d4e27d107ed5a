//! Pipeline orchestration
//!
//! Composes the planning stages (decode, extract, order, transform,
//! encode) into one pass that produces a command file, and wraps the two
//! serial links for the acquire and plot ends of a full cycle.
//!
//! Failures from every stage are surfaced unchanged, annotated with the
//! [`Stage`] that produced them. Each pass runs in its own tracing span
//! tagged with a fresh session id.

use image::imageops::FilterType;
use penplot_camtools::{
    encode_frame, payload, penup_distance, preview, CommandEncoder, ContourAdapter, EdgeFilter,
    GeometryTransformer, OrderedPath, PathOrderer, RasterCodec,
};
use penplot_communication::{
    ChannelOpener, ControllerConfig, ControllerLink, FpgaConfig, FpgaLink, FpgaReport,
    SerialPortOpener, StreamReport,
};
use penplot_core::artifact;
use penplot_core::{
    CancelFlag, Command, MmPolyline, PixelPoint, Progress, RasterFrame, Result, Stage,
    StageContext,
};
use penplot_settings::Config;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Statistics of one planning pass
#[derive(Debug, Clone, PartialEq)]
pub struct PlanReport {
    /// Session id used in the log span
    pub session_id: Uuid,
    /// Contours kept after the minimum-length filter
    pub contours: usize,
    /// Pen-up travel in tracing order, in pixels
    pub travel_before: f64,
    /// Pen-up travel after ordering, in pixels
    pub travel_after: f64,
    /// Pixel points before simplification
    pub points_before: usize,
    /// Millimeter points after simplification and densification
    pub points_after: usize,
    /// Commands generated
    pub commands: usize,
}

impl PlanReport {
    /// Fraction of the tracing-order travel saved by ordering
    pub fn travel_saved(&self) -> f64 {
        if self.travel_before > 0.0 {
            1.0 - self.travel_after / self.travel_before
        } else {
            0.0
        }
    }
}

/// Output of one planning pass
#[derive(Debug, Clone)]
pub struct Plan {
    /// Contours in plot order, in pixels
    pub ordered: OrderedPath,
    /// Transformed polylines, in millimeters
    pub polylines: Vec<MmPolyline>,
    /// Encoded commands
    pub commands: Vec<Command>,
    /// Pass statistics
    pub report: PlanReport,
}

/// Outcome of a full acquire, plan and plot cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// FPGA exchange
    pub acquire: FpgaReport,
    /// Planning pass
    pub plan: PlanReport,
    /// Command stream
    pub plot: StreamReport,
}

/// The plotting pipeline, built once from a [`Config`]
pub struct Pipeline {
    codec: RasterCodec,
    contours: ContourAdapter,
    orderer: PathOrderer,
    start: Option<PixelPoint>,
    transformer: GeometryTransformer,
    encoder: CommandEncoder,
    filter: Box<dyn EdgeFilter>,
    payload_size: (u32, u32),
    fpga: FpgaConfig,
    controller: ControllerConfig,
    fpga_opener: Arc<dyn ChannelOpener>,
    controller_opener: Arc<dyn ChannelOpener>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("raster", self.codec.spec())
            .field("contours", &self.contours)
            .field("start", &self.start)
            .field("geometry", self.transformer.params())
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build every stage from `config`, with both links on hardware ports
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            codec: config.raster_codec(),
            contours: config.contour_adapter(),
            orderer: config.path_orderer(),
            start: config.ordering.start,
            transformer: config.geometry_transformer()?,
            encoder: config.command_encoder()?,
            filter: Box::new(config.filter),
            payload_size: (config.fpga.image_width, config.fpga.image_height),
            fpga: config.fpga_config(),
            controller: config.controller_config(),
            fpga_opener: Arc::new(SerialPortOpener),
            controller_opener: Arc::new(SerialPortOpener),
        })
    }

    /// Replace the channel openers used by the two links
    pub fn with_openers(
        mut self,
        fpga: Arc<dyn ChannelOpener>,
        controller: Arc<dyn ChannelOpener>,
    ) -> Self {
        self.fpga_opener = fpga;
        self.controller_opener = controller;
        self
    }

    /// Replace the host-side edge filter
    pub fn with_filter(mut self, filter: Box<dyn EdgeFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Run decode, extract, order, transform and encode on raw bytes.
    pub fn plan(&self, bytes: &[u8]) -> Result<Plan> {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("plan", session = %session_id);
        let _enter = span.enter();

        let frame = self.codec.decode(bytes).stage(Stage::Decode)?;
        tracing::info!(
            "Decoded {}x{} frame, {} pixels on",
            frame.width(),
            frame.height(),
            frame.count_on()
        );

        let contours = self.contours.extract(&frame).stage(Stage::Extract)?;
        let travel_before = penup_distance(&contours, self.start);
        let contour_count = contours.len();

        let ordered = self.orderer.order(contours);
        let points_before = ordered.point_count();

        let polylines = self
            .transformer
            .transform_all(ordered.polylines())
            .stage(Stage::Transform)?;
        let points_after = polylines.iter().map(MmPolyline::len).sum();

        let commands = self.encoder.encode(&polylines);

        let report = PlanReport {
            session_id,
            contours: contour_count,
            travel_before,
            travel_after: ordered.total_travel(),
            points_before,
            points_after,
            commands: commands.len(),
        };
        tracing::info!(
            "Planned {} contours: travel {:.1}px -> {:.1}px, {} -> {} points, {} commands",
            report.contours,
            report.travel_before,
            report.travel_after,
            report.points_before,
            report.points_after,
            report.commands
        );

        Ok(Plan {
            ordered,
            polylines,
            commands,
            report,
        })
    }

    /// Plan from a received hex artifact and write the command file.
    ///
    /// The command file is written only once encoding has succeeded, so a
    /// failed pass never leaves a partial file behind. With `preview` set
    /// the ordered path is also rendered to that image.
    pub fn plan_file(
        &self,
        artifact_path: &Path,
        commands_path: &Path,
        preview_path: Option<&Path>,
    ) -> Result<PlanReport> {
        let bytes = artifact::read_hex(artifact_path).stage(Stage::Decode)?;
        let plan = self.plan(&bytes)?;

        self.encoder
            .write_command_file(commands_path, &plan.commands)
            .stage(Stage::Persist)?;

        if let Some(preview_path) = preview_path {
            let spec = self.codec.spec();
            let image = preview::render(
                spec.width as u32,
                spec.height as u32,
                &plan.ordered,
                self.start,
            );
            preview::save(preview_path, &image).stage(Stage::Persist)?;
        }

        Ok(plan.report)
    }

    /// Run the host-side edge filter on an image and write the result as
    /// an artifact laid out like the accelerator's response.
    pub fn filter_file(&self, image_path: &Path, artifact_path: &Path) -> Result<RasterFrame> {
        let image = payload::load_image(image_path).stage(Stage::Acquire)?;
        let spec = self.codec.spec();
        let (width, height) = (spec.width as u32, spec.height as u32);

        let image = if image.width() == width && image.height() == height {
            image
        } else {
            image.resize_exact(width, height, FilterType::Lanczos3)
        };
        let frame = self.filter.filter(&image);
        let bytes = encode_frame(&frame, spec);

        artifact::write_hex(artifact_path, &bytes).stage(Stage::Acquire)?;
        tracing::info!(
            "Filtered {} into {} ({} edge pixels)",
            image_path.display(),
            artifact_path.display(),
            frame.count_on()
        );
        Ok(frame)
    }

    /// Load an image and turn it into the RGB payload the accelerator takes
    pub fn prepare_payload(&self, image_path: &Path) -> Result<Vec<u8>> {
        let image = payload::load_image(image_path).stage(Stage::Acquire)?;
        let (width, height) = self.payload_size;
        Ok(payload::rgb_payload(&image, width, height))
    }

    /// Send an image to the accelerator and store its response in
    /// `artifact_path`.
    pub fn acquire(
        &self,
        image_path: &Path,
        artifact_path: &Path,
        cancel: &CancelFlag,
        progress: impl FnMut(Progress),
    ) -> Result<FpgaReport> {
        let payload = self.prepare_payload(image_path)?;
        let mut link = FpgaLink::new(self.fpga.clone(), self.fpga_opener.clone())
            .stage(Stage::Acquire)?;
        link.exchange(&payload, artifact_path, cancel, progress)
            .stage(Stage::Acquire)
    }

    /// Validate a command file and stream it to the controller.
    ///
    /// The file is read once; the validated lines are what gets streamed.
    pub fn plot(
        &self,
        commands_path: &Path,
        cancel: &CancelFlag,
        progress: impl FnMut(Progress),
    ) -> Result<StreamReport> {
        let lines = artifact::read_lines(commands_path).stage(Stage::Plot)?;
        let commands = self.encoder.parse_lines(&lines).stage(Stage::Plot)?;
        tracing::debug!(
            "Validated {} commands from {}",
            commands.len(),
            commands_path.display()
        );

        let link = ControllerLink::new(self.controller.clone(), self.controller_opener.clone())
            .stage(Stage::Plot)?;
        link.send_lines(&lines, cancel, progress)
            .stage(Stage::Plot)
    }

    /// Acquire, plan and plot in one go.
    ///
    /// Progress is reported per stage: payload bytes during
    /// [`Stage::Acquire`], acknowledged commands during [`Stage::Plot`].
    pub fn run_cycle(
        &self,
        image_path: &Path,
        artifact_path: &Path,
        commands_path: &Path,
        cancel: &CancelFlag,
        mut progress: impl FnMut(Stage, Progress),
    ) -> Result<CycleReport> {
        let cycle = Uuid::new_v4();
        let span = tracing::info_span!("cycle", cycle = %cycle);
        let _enter = span.enter();

        let acquire = self.acquire(image_path, artifact_path, cancel, |p| {
            progress(Stage::Acquire, p)
        })?;
        let plan = self.plan_file(artifact_path, commands_path, None)?;
        let plot = self.plot(commands_path, cancel, |p| progress(Stage::Plot, p))?;

        tracing::info!(
            "Cycle complete: {} bytes acquired, {} commands plotted",
            acquire.received,
            plot.commands
        );
        Ok(CycleReport {
            acquire,
            plan,
            plot,
        })
    }
}
