//! Capture execution engine.
//!
//! One engine instance drives both passes of a tick: screens first, then
//! regions. All state lives on the engine and every entry point takes
//! `&mut self`; callers serialize access onto one logical thread (the
//! [`SharedEngine`] mutex is the seam for shells that need to share it).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use uuid::Uuid;

use crate::capture::{
    CaptureProvider, CaptureSource, ImageFormat, SaveRequest, ScreenshotKind, ScreenshotLog,
    REGION_COMPONENT,
};
use crate::macros::{MacroContext, MacroExpander};
use crate::targets::{Region, RegionCollection, Screen, ScreenCollection};
use crate::triggers::TriggerAction;
use crate::utils;

/// Foreground-window facts snapshotted once at the top of a tick. Both passes
/// of the tick see the same values even if focus changes mid-tick.
#[derive(Debug, Clone, Default)]
pub struct PassContext {
    pub window_title: String,
    pub process_name: String,
}

impl PassContext {
    pub fn snapshot(provider: &dyn CaptureProvider) -> Self {
        Self {
            window_title: provider.active_window_title(),
            process_name: provider.active_window_process(),
        }
    }
}

/// Case-insensitive substring filter on the foreground window title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFilter {
    pub enabled: bool,
    pub text: String,
}

impl TitleFilter {
    /// True when the filter is enabled, non-empty, and the title does not
    /// contain the filter text (ignoring case).
    pub fn rejects(&self, window_title: &str) -> bool {
        if !self.enabled || self.text.is_empty() {
            return false;
        }
        !window_title.to_lowercase().contains(&self.text.to_lowercase())
    }
}

/// What happened in one pass over one target kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOutcome {
    pub succeeded: u32,
    pub failed: u32,
    /// The title filter short-circuited the pass.
    pub halted: bool,
}

/// Both pass outcomes of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub screens: PassOutcome,
    pub regions: PassOutcome,
}

/// Session-lifetime capture counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureTotals {
    pub succeeded: u64,
    pub failed: u64,
}

/// Handle type for shells that hand the engine across component boundaries.
pub type SharedEngine = Arc<Mutex<CaptureEngine>>;

pub struct CaptureEngine {
    provider: Box<dyn CaptureProvider>,
    macros: Box<dyn MacroExpander>,
    filter: TitleFilter,
    label: Option<String>,
    running: bool,
    capture_now: bool,
    error: bool,
    totals: CaptureTotals,
    shots: ScreenshotLog,
}

impl CaptureEngine {
    pub fn new(provider: Box<dyn CaptureProvider>, macros: Box<dyn MacroExpander>) -> Self {
        Self {
            provider,
            macros,
            filter: TitleFilter::default(),
            label: None,
            running: false,
            capture_now: false,
            error: false,
            totals: CaptureTotals::default(),
            shots: ScreenshotLog::new(),
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            info!("capture session started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            info!("capture session stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Arm the one-shot override: the next gated target captures even when
    /// the title filter would reject it.
    pub fn capture_now(&mut self) {
        self.capture_now = true;
    }

    pub fn set_title_filter(&mut self, filter: TitleFilter) {
        self.filter = filter;
    }

    pub fn title_filter(&self) -> &TitleFilter {
        &self.filter
    }

    /// Label applied to every subsequent save request, or `None` to disable
    /// labeling.
    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Set when a pass aborted on a provider error. Sticky until cleared by
    /// the shell.
    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn clear_error(&mut self) {
        self.error = false;
    }

    pub fn totals(&self) -> CaptureTotals {
        self.totals
    }

    pub fn screenshots(&self) -> &ScreenshotLog {
        &self.shots
    }

    /// Dispatch a trigger action the engine understands. Returns false for
    /// actions that belong to the shell (interface, preview, schedule...).
    pub fn handle_action(&mut self, action: TriggerAction) -> bool {
        match action {
            TriggerAction::StartCapture => {
                self.start();
                true
            }
            TriggerAction::StopCapture => {
                self.stop();
                true
            }
            _ => false,
        }
    }

    /// One timer tick. Does nothing unless the session is running.
    pub fn tick(&mut self, screens: &ScreenCollection, regions: &RegionCollection) -> TickReport {
        if !self.running {
            return TickReport::default();
        }
        self.run_once(screens, regions)
    }

    /// Run both passes immediately, regardless of the running flag.
    pub fn run_once(
        &mut self,
        screens: &ScreenCollection,
        regions: &RegionCollection,
    ) -> TickReport {
        let ctx = PassContext::snapshot(self.provider.as_ref());
        TickReport {
            screens: self.run_screen_pass(screens, &ctx),
            regions: self.run_region_pass(regions, &ctx),
        }
    }

    fn run_screen_pass(&mut self, screens: &ScreenCollection, ctx: &PassContext) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        if let Err(err) = self.screen_pass(screens, ctx, &mut outcome) {
            self.error = true;
            error!(pass = "screens", error = %err, "capture pass aborted");
        }
        outcome
    }

    fn run_region_pass(&mut self, regions: &RegionCollection, ctx: &PassContext) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        if let Err(err) = self.region_pass(regions, ctx, &mut outcome) {
            self.error = true;
            error!(pass = "regions", error = %err, "capture pass aborted");
        }
        outcome
    }

    /// Returns Ok(()) whether the pass completed or was halted by the filter;
    /// Err only for provider errors. A persist failure stops this pass.
    fn screen_pass(
        &mut self,
        screens: &ScreenCollection,
        ctx: &PassContext,
        outcome: &mut PassOutcome,
    ) -> anyhow::Result<()> {
        for screen in screens {
            if !screen.active {
                continue;
            }
            if !self.pass_gate(ctx, outcome) {
                return Ok(());
            }

            // The active window is grabbed as-is; compositing the cursor
            // into it is not supported.
            let (source, mouse) = if screen.component == 0 {
                (CaptureSource::ActiveWindow, false)
            } else {
                (CaptureSource::Display(screen.component as u32), screen.mouse)
            };

            let Some(image) = self.provider.acquire(source, mouse, screen.scale)? else {
                continue;
            };

            let request = self.screen_request(screen, source, ctx);
            if self.provider.persist(&request, image, &mut self.shots)? {
                outcome.succeeded += 1;
                self.totals.succeeded += 1;
            } else {
                outcome.failed += 1;
                self.totals.failed += 1;
                debug!(target = %screen.name, "screen save failed; stopping pass");
                break;
            }
        }
        Ok(())
    }

    /// Same shape as the screen pass, except a save failure moves on to the
    /// next region instead of stopping.
    fn region_pass(
        &mut self,
        regions: &RegionCollection,
        ctx: &PassContext,
        outcome: &mut PassOutcome,
    ) -> anyhow::Result<()> {
        for region in regions {
            if !region.active {
                continue;
            }
            if !self.pass_gate(ctx, outcome) {
                return Ok(());
            }

            let source = CaptureSource::Area(region.rect);
            let Some(image) = self.provider.acquire(source, region.mouse, region.scale)? else {
                continue;
            };

            let request = self.region_request(region, ctx);
            if self.provider.persist(&request, image, &mut self.shots)? {
                outcome.succeeded += 1;
                self.totals.succeeded += 1;
            } else {
                outcome.failed += 1;
                self.totals.failed += 1;
                debug!(target = %region.name, "region save failed; continuing pass");
            }
        }
        Ok(())
    }

    /// Shared per-target gate. False means stop iterating this pass. A target
    /// that passes the gate consumes the one-shot override, so at most one
    /// filtered tick's worth of targets benefits from it.
    fn pass_gate(&mut self, ctx: &PassContext, outcome: &mut PassOutcome) -> bool {
        // No foreground title was available at snapshot time. The context is
        // fixed for the whole pass, so no later target would see one either.
        if ctx.window_title.is_empty() {
            return false;
        }
        if self.filter.rejects(&ctx.window_title) && !self.capture_now {
            debug!(filter = %self.filter.text, "title filter rejected; halting pass");
            outcome.halted = true;
            return false;
        }
        self.capture_now = false;
        true
    }

    fn screen_request(
        &self,
        screen: &Screen,
        source: CaptureSource,
        ctx: &PassContext,
    ) -> SaveRequest {
        let kind = if screen.component == 0 {
            ScreenshotKind::ActiveWindow
        } else {
            ScreenshotKind::Screen
        };
        self.request(
            kind,
            source.component(),
            screen.view_id,
            &screen.name,
            &screen.folder,
            &screen.macro_template,
            screen.format,
            screen.quality,
            ctx,
        )
    }

    fn region_request(&self, region: &Region, ctx: &PassContext) -> SaveRequest {
        self.request(
            ScreenshotKind::Region,
            REGION_COMPONENT,
            region.view_id,
            &region.name,
            &region.folder,
            &region.macro_template,
            region.format,
            region.quality,
            ctx,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn request(
        &self,
        kind: ScreenshotKind,
        component: i32,
        view_id: Uuid,
        name: &str,
        folder_template: &str,
        filename_template: &str,
        format: ImageFormat,
        quality: u8,
        ctx: &PassContext,
    ) -> SaveRequest {
        let folder = utils::correct_folder_path(&self.macros.expand(folder_template));
        let macro_ctx = MacroContext {
            name,
            component,
            format,
            window_title: &ctx.window_title,
        };
        let file = self.macros.expand_with(filename_template, &macro_ctx);
        SaveRequest {
            path: format!("{folder}{file}"),
            format,
            quality,
            kind,
            component,
            view_id,
            label: self.label.clone(),
            window_title: ctx.window_title.clone(),
            process_name: ctx.process_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        CaptureError, CaptureResult, CapturedImage, DisplayInfo, ImageFormat, Rect,
    };
    use crate::targets::TargetCollection;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeState {
        title: String,
        process: String,
        acquires: Vec<(i32, bool, u32)>,
        persists: Vec<SaveRequest>,
        fail_persist_for: Vec<i32>,
        none_for: Vec<i32>,
        err_on_acquire: bool,
    }

    #[derive(Clone)]
    struct FakeProvider(Arc<Mutex<FakeState>>);

    impl FakeProvider {
        fn with_title(title: &str) -> (Self, Arc<Mutex<FakeState>>) {
            let state = Arc::new(Mutex::new(FakeState {
                title: title.to_string(),
                process: "editor-bin".to_string(),
                ..FakeState::default()
            }));
            (Self(state.clone()), state)
        }

        fn image() -> CapturedImage {
            CapturedImage { data: vec![0; 16], width: 2, height: 2, bytes_per_row: 8 }
        }
    }

    impl CaptureProvider for FakeProvider {
        fn displays(&self) -> Vec<DisplayInfo> {
            vec![DisplayInfo { index: 1, bounds: Rect { x: 0, y: 0, width: 800, height: 600 } }]
        }

        fn active_window_title(&self) -> String {
            self.0.lock().title.clone()
        }

        fn active_window_process(&self) -> String {
            self.0.lock().process.clone()
        }

        fn acquire(
            &mut self,
            source: CaptureSource,
            mouse: bool,
            scale: u32,
        ) -> CaptureResult<Option<CapturedImage>> {
            let mut state = self.0.lock();
            if state.err_on_acquire {
                return Err(CaptureError::CaptureFailed("grab failed".to_string()));
            }
            state.acquires.push((source.component(), mouse, scale));
            if state.none_for.contains(&source.component()) {
                return Ok(None);
            }
            Ok(Some(Self::image()))
        }

        fn persist(
            &mut self,
            request: &SaveRequest,
            _image: CapturedImage,
            log: &mut ScreenshotLog,
        ) -> CaptureResult<bool> {
            let mut state = self.0.lock();
            state.persists.push(request.clone());
            if state.fail_persist_for.contains(&request.component) {
                return Ok(false);
            }
            log.record(crate::capture::ScreenshotRecord::from_request(request));
            Ok(true)
        }
    }

    struct EchoMacros;

    impl MacroExpander for EchoMacros {
        fn expand(&self, template: &str) -> String {
            template.to_string()
        }

        fn expand_with(&self, template: &str, ctx: &MacroContext<'_>) -> String {
            template
                .replace("%name%", ctx.name)
                .replace("%format%", ctx.format.name())
        }
    }

    fn screen(name: &str, component: i32) -> Screen {
        Screen {
            view_id: Uuid::new_v4(),
            name: name.to_string(),
            folder: "shots".to_string(),
            macro_template: "%name%.%format%".to_string(),
            component,
            format: ImageFormat::Png,
            quality: 90,
            scale: 100,
            mouse: true,
            active: true,
        }
    }

    fn region(name: &str) -> Region {
        Region {
            view_id: Uuid::new_v4(),
            name: name.to_string(),
            folder: "shots".to_string(),
            macro_template: "%name%.%format%".to_string(),
            rect: Rect { x: 0, y: 0, width: 100, height: 100 },
            format: ImageFormat::Png,
            quality: 90,
            scale: 100,
            mouse: true,
            active: true,
        }
    }

    fn engine_with_title(title: &str) -> (CaptureEngine, Arc<Mutex<FakeState>>) {
        let (provider, state) = FakeProvider::with_title(title);
        let mut engine = CaptureEngine::new(Box::new(provider), Box::new(EchoMacros));
        engine.start();
        (engine, state)
    }

    fn screens(targets: Vec<Screen>) -> ScreenCollection {
        let mut collection = TargetCollection::new();
        for target in targets {
            collection.add(target);
        }
        collection
    }

    fn regions(targets: Vec<Region>) -> RegionCollection {
        let mut collection = TargetCollection::new();
        for target in targets {
            collection.add(target);
        }
        collection
    }

    #[test]
    fn tick_is_a_no_op_when_stopped() {
        let (mut engine, state) = engine_with_title("editor");
        engine.stop();

        let report = engine.tick(&screens(vec![screen("one", 1)]), &regions(vec![]));
        assert_eq!(report, TickReport::default());
        assert!(state.lock().acquires.is_empty());
    }

    #[test]
    fn inactive_targets_are_skipped() {
        let (mut engine, state) = engine_with_title("editor");
        let mut off = screen("off", 1);
        off.active = false;

        let report = engine.tick(&screens(vec![off, screen("on", 2)]), &regions(vec![]));
        assert_eq!(report.screens.succeeded, 1);
        assert_eq!(state.lock().acquires.len(), 1);
        assert_eq!(state.lock().acquires[0].0, 2);
    }

    #[test]
    fn title_filter_halts_both_passes_without_capturing() {
        let (mut engine, state) = engine_with_title("spreadsheet");
        engine.set_title_filter(TitleFilter { enabled: true, text: "editor".to_string() });

        let report =
            engine.tick(&screens(vec![screen("one", 1)]), &regions(vec![region("corner")]));
        assert!(report.screens.halted);
        assert!(report.regions.halted);
        assert_eq!(report.screens.succeeded, 0);
        assert!(state.lock().acquires.is_empty());
        assert!(!engine.has_error());
    }

    #[test]
    fn title_filter_match_is_case_insensitive() {
        let (mut engine, state) = engine_with_title("My EDITOR - main.rs");
        engine.set_title_filter(TitleFilter { enabled: true, text: "editor".to_string() });

        let report = engine.tick(&screens(vec![screen("one", 1)]), &regions(vec![]));
        assert!(!report.screens.halted);
        assert_eq!(report.screens.succeeded, 1);
        assert_eq!(state.lock().persists.len(), 1);
    }

    #[test]
    fn capture_now_overrides_the_filter_once() {
        let (mut engine, state) = engine_with_title("spreadsheet");
        engine.set_title_filter(TitleFilter { enabled: true, text: "editor".to_string() });
        engine.capture_now();

        let report = engine.tick(
            &screens(vec![screen("first", 1), screen("second", 2)]),
            &regions(vec![]),
        );

        // The first target consumes the override; the second is gated again.
        assert_eq!(report.screens.succeeded, 1);
        assert!(report.screens.halted);
        assert_eq!(state.lock().acquires.len(), 1);

        // The override never survives a tick.
        let next = engine.tick(&screens(vec![screen("first", 1)]), &regions(vec![]));
        assert!(next.screens.halted);
    }

    #[test]
    fn empty_window_title_skips_targets_without_halting() {
        let (mut engine, state) = engine_with_title("");

        let report =
            engine.tick(&screens(vec![screen("one", 1)]), &regions(vec![region("corner")]));
        assert_eq!(report.screens, PassOutcome::default());
        assert_eq!(report.regions, PassOutcome::default());
        assert!(state.lock().acquires.is_empty());
    }

    #[test]
    fn active_window_capture_never_includes_the_cursor() {
        let (mut engine, state) = engine_with_title("editor");
        let mut target = screen("focus", 0);
        target.mouse = true;

        engine.tick(&screens(vec![target]), &regions(vec![]));
        let state = state.lock();
        assert_eq!(state.acquires, vec![(0, false, 100)]);
        assert_eq!(state.persists[0].kind, ScreenshotKind::ActiveWindow);
    }

    #[test]
    fn screen_save_failure_stops_the_screen_pass() {
        let (mut engine, state) = engine_with_title("editor");
        state.lock().fail_persist_for.push(2);

        let report = engine.tick(
            &screens(vec![screen("a", 1), screen("b", 2), screen("c", 3)]),
            &regions(vec![]),
        );

        assert_eq!(report.screens.succeeded, 1);
        assert_eq!(report.screens.failed, 1);
        // The third target is never attempted.
        assert_eq!(state.lock().persists.len(), 2);
        assert!(!engine.has_error());
    }

    #[test]
    fn region_save_failure_continues_the_region_pass() {
        let (mut engine, state) = engine_with_title("editor");
        state.lock().fail_persist_for.push(REGION_COMPONENT);

        let report =
            engine.tick(&screens(vec![]), &regions(vec![region("a"), region("b")]));

        // Every region fails to save, yet all of them are attempted.
        assert_eq!(report.regions.failed, 2);
        assert_eq!(state.lock().persists.len(), 2);
    }

    #[test]
    fn acquire_returning_nothing_skips_without_counting_failure() {
        let (mut engine, state) = engine_with_title("editor");
        state.lock().none_for.push(1);

        let report = engine.tick(&screens(vec![screen("a", 1), screen("b", 2)]), &regions(vec![]));
        assert_eq!(report.screens.succeeded, 1);
        assert_eq!(report.screens.failed, 0);
        assert_eq!(state.lock().persists.len(), 1);
    }

    #[test]
    fn provider_error_aborts_the_pass_and_sets_the_error_flag() {
        let (mut engine, state) = engine_with_title("editor");
        state.lock().err_on_acquire = true;

        let report = engine.tick(&screens(vec![screen("a", 1)]), &regions(vec![]));
        assert_eq!(report.screens, PassOutcome::default());
        assert!(engine.has_error());

        engine.clear_error();
        assert!(!engine.has_error());
    }

    #[test]
    fn save_requests_carry_expanded_paths_and_context() {
        let (mut engine, state) = engine_with_title("editor - main.rs");
        engine.set_label(Some("standup".to_string()));

        engine.tick(&screens(vec![screen("desk", 1)]), &regions(vec![region("corner")]));

        let state = state.lock();
        let sep = std::path::MAIN_SEPARATOR;
        assert_eq!(state.persists[0].path, format!("shots{sep}desk.png"));
        assert_eq!(state.persists[0].window_title, "editor - main.rs");
        assert_eq!(state.persists[0].process_name, "editor-bin");
        assert_eq!(state.persists[0].label.as_deref(), Some("standup"));
        assert_eq!(state.persists[1].kind, ScreenshotKind::Region);
        assert_eq!(state.persists[1].component, REGION_COMPONENT);
    }

    #[test]
    fn totals_accumulate_across_ticks() {
        let (mut engine, state) = engine_with_title("editor");
        let collection = screens(vec![screen("a", 1)]);

        engine.tick(&collection, &regions(vec![]));
        engine.tick(&collection, &regions(vec![]));
        state.lock().fail_persist_for.push(1);
        engine.tick(&collection, &regions(vec![]));

        assert_eq!(engine.totals(), CaptureTotals { succeeded: 2, failed: 1 });
        assert_eq!(engine.screenshots().len(), 2);
    }

    #[test]
    fn trigger_actions_map_to_session_control() {
        let (mut engine, _state) = engine_with_title("editor");
        assert!(engine.handle_action(TriggerAction::StopCapture));
        assert!(!engine.is_running());
        assert!(engine.handle_action(TriggerAction::StartCapture));
        assert!(engine.is_running());
        assert!(!engine.handle_action(TriggerAction::ShowInterface));
    }
}
