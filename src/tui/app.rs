// Terminal App State
//
// Owns everything the UI thread shows: per-module log buffers, the
// dashboard snapshot, menu selection and forms. Worker threads reach
// it only through the UiEvent queue.
//

use super::form::{Form, FormResponse};
use super::quit::QuitGuard;
use crate::config::{read_config, write_config, HarvestConfig, HarvestInterval, ReloadSignal};
use crate::context::AppContext;
use crate::event::{LogScope, UiEvent};
use crate::harvest::Harvester;
use crate::miner::{MinerSupervisor, MiningParams, StartOutcome};
use crate::pool::{DashboardRefresher, PoolStats};
use crate::types::{HarvestToken, TokenBalance};
use crate::wallet::CreateOutcome;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::ListState;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Instant;

/// Lines kept per log view
const LOG_CAPACITY: usize = 500;

/// Button actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartMining(usize),
    StopMining(usize),
    SaveHarvestConfig,
    ManualHarvest,
    CreateWallet,
    Login,
    ExportPublicKey,
    ExportPrivateKey,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Miner(usize),
    Harvest,
    Wallet,
}

impl Screen {
    pub fn scope(self, supervisors: &[MinerSupervisor]) -> LogScope {
        match self {
            Screen::Dashboard => LogScope::Dashboard,
            Screen::Miner(i) => supervisors[i].backend().scope,
            Screen::Harvest => LogScope::Harvest,
            Screen::Wallet => LogScope::Wallet,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Menu,
    Form,
}

pub struct App {
    pub ctx: AppContext,
    pub supervisors: Vec<MinerSupervisor>,
    pub harvester: Harvester,
    dashboard: DashboardRefresher,
    reload: Sender<ReloadSignal>,
    events: Receiver<UiEvent>,
    pub logs: HashMap<LogScope, VecDeque<String>>,
    pub balances: Option<(f64, Vec<TokenBalance>)>,
    pub prices: HashMap<String, f64>,
    pub pool: Option<PoolStats>,
    pub menu: ListState,
    pub focus: Focus,
    pub miner_forms: Vec<Form>,
    pub harvest_form: Form,
    pub wallet_form: Form,
    quit: QuitGuard,
    should_quit: bool,
}

impl App {
    pub fn new(
        ctx: AppContext,
        supervisors: Vec<MinerSupervisor>,
        harvester: Harvester,
        dashboard: DashboardRefresher,
        reload: Sender<ReloadSignal>,
        events: Receiver<UiEvent>,
    ) -> Self {
        let config = read_config(&ctx.paths.config_file()).unwrap_or_else(|e| {
            tracing::warn!("[App] Using default harvest config: {}", e);
            HarvestConfig::default()
        });

        let miner_forms = supervisors
            .iter()
            .enumerate()
            .map(|(i, s)| miner_form(i, s))
            .collect();

        let mut menu = ListState::default();
        menu.select(Some(0));

        Self {
            harvest_form: harvest_form(&config),
            wallet_form: wallet_form(),
            miner_forms,
            ctx,
            supervisors,
            harvester,
            dashboard,
            reload,
            events,
            logs: HashMap::new(),
            balances: None,
            prices: HashMap::new(),
            pool: None,
            menu,
            focus: Focus::Menu,
            quit: QuitGuard::default(),
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Menu entries in display order; the last one is the quit hint
    pub fn menu_items(&self) -> Vec<String> {
        let mut items = vec!["Dashboard".to_string()];
        items.extend(self.supervisors.iter().map(|s| s.backend().scope.title().to_string()));
        items.push(LogScope::Harvest.title().to_string());
        items.push(LogScope::Wallet.title().to_string());
        items.push("QUIT (Press 'q' 4 times)".to_string());
        items
    }

    pub fn screen(&self) -> Option<Screen> {
        let index = self.menu.selected().unwrap_or(0);
        let miners = self.supervisors.len();
        match index {
            0 => Some(Screen::Dashboard),
            i if i <= miners => Some(Screen::Miner(i - 1)),
            i if i == miners + 1 => Some(Screen::Harvest),
            i if i == miners + 2 => Some(Screen::Wallet),
            _ => None,
        }
    }

    pub fn active_form(&self) -> Option<&Form> {
        match self.screen()? {
            Screen::Dashboard => None,
            Screen::Miner(i) => self.miner_forms.get(i),
            Screen::Harvest => Some(&self.harvest_form),
            Screen::Wallet => Some(&self.wallet_form),
        }
    }

    fn active_form_mut(&mut self) -> Option<&mut Form> {
        match self.screen()? {
            Screen::Dashboard => None,
            Screen::Miner(i) => self.miner_forms.get_mut(i),
            Screen::Harvest => Some(&mut self.harvest_form),
            Screen::Wallet => Some(&mut self.wallet_form),
        }
    }

    pub fn log_lines(&self, scope: LogScope) -> impl Iterator<Item = &String> {
        self.logs.get(&scope).into_iter().flatten()
    }

    fn log(&self, scope: LogScope, line: impl Into<String>) {
        self.ctx.sink.log(scope, line);
    }

    /// Apply every queued worker event
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log { scope, at, line } => {
                let buffer = self.logs.entry(scope).or_default();
                if buffer.len() == LOG_CAPACITY {
                    buffer.pop_front();
                }
                buffer.push_back(format!("[{}] {}", at.format("%H:%M:%S"), line));
            }
            UiEvent::RefreshRequested => {
                self.dashboard.spawn_balance_refresh();
            }
            UiEvent::Balances { native, tokens } => self.balances = Some((native, tokens)),
            UiEvent::Prices(prices) => self.prices = prices,
            UiEvent::Pool(stats) => self.pool = Some(stats),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let typing = self.focus == Focus::Form && self.active_form().is_some_and(Form::editing_text);
        if key.code == KeyCode::Char('q') && !typing {
            if self.quit.press(Instant::now()) {
                self.shutdown();
            }
            return;
        }

        match self.focus {
            Focus::Menu => self.handle_menu_key(key),
            Focus::Form => {
                let response = match self.active_form_mut() {
                    Some(form) => form.handle_key(key),
                    None => FormResponse::Leave,
                };
                match response {
                    FormResponse::Submit(action) => self.perform(action),
                    FormResponse::Leave => self.focus = Focus::Menu,
                    FormResponse::Consumed | FormResponse::Ignored => {}
                }
            }
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let count = self.menu_items().len();
        let selected = self.menu.selected().unwrap_or(0);
        match key.code {
            KeyCode::Up => self.menu.select(Some((selected + count - 1) % count)),
            KeyCode::Down => self.menu.select(Some((selected + 1) % count)),
            KeyCode::Enter | KeyCode::Tab | KeyCode::Right => {
                if self.active_form().is_some() {
                    self.focus = Focus::Form;
                }
            }
            _ => {}
        }
    }

    pub fn perform(&mut self, action: Action) {
        match action {
            Action::StartMining(i) => self.start_mining(i),
            Action::StopMining(i) => {
                let supervisor = self.supervisors[i].clone();
                thread::spawn(move || supervisor.stop());
            }
            Action::SaveHarvestConfig => self.save_harvest_config(),
            Action::ManualHarvest => {
                let form = &self.harvest_form;
                let token = HarvestToken::from_symbol(form.value("manual_token")).unwrap_or(HarvestToken::PRIMARY);
                self.harvester.spawn_manual(form.value("manual_sol").to_string(), token);
            }
            Action::CreateWallet => self.create_wallet(),
            Action::Login => self.login(),
            Action::ExportPublicKey => self.export_public_key(),
            Action::ExportPrivateKey => self.export_private_key(),
            Action::Logout => {
                self.ctx.wallet.logout();
                self.balances = None;
                self.pool = None;
                self.log(LogScope::Wallet, "Logged out");
            }
        }
    }

    fn start_mining(&mut self, index: usize) {
        let supervisor = &self.supervisors[index];
        let backend = supervisor.backend();

        let Some(public_key) = self.ctx.wallet.public_key() else {
            self.log(backend.scope, "Please login to your wallet first");
            return;
        };

        let form = &self.miner_forms[index];
        let defaults = backend.default_params();
        let params = MiningParams {
            algorithm: form.value("algorithm").to_string(),
            port: form.value("port").parse().unwrap_or(defaults.port),
            worker: match form.value("worker").trim() {
                "" => defaults.worker,
                worker => worker.to_string(),
            },
            threads: form
                .value("threads")
                .parse()
                .ok()
                .filter(|t| *t > 0)
                .unwrap_or(defaults.threads),
        };

        let launch = backend.launch_spec(&self.ctx.paths, &public_key, &params);
        match supervisor.start(launch) {
            Ok(StartOutcome::Started { pid }) => {
                tracing::info!("[App] {} started with pid {}", backend.name, pid);
            }
            Ok(StartOutcome::AlreadyRunning | StartOutcome::Stopping) => {}
            Err(e) => tracing::warn!("[App] {} failed to start: {}", backend.name, e),
        }
    }

    fn save_harvest_config(&mut self) {
        let path = self.ctx.paths.config_file();
        let form = &self.harvest_form;

        let sol_per_harvest = match form.value("sol_per_harvest").trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount >= 0.0 => amount,
            _ => {
                let text = form.value("sol_per_harvest").to_string();
                self.log(LogScope::Harvest, format!("Invalid SOL per harvest: {}", text));
                return;
            }
        };

        // harvestBurn is not editable here; keep what is on disk
        let mut config = read_config(&path).unwrap_or_default();
        config.sol_per_harvest = sol_per_harvest;
        config.token_to_harvest = HarvestToken::from_symbol(form.value("token")).unwrap_or(HarvestToken::PRIMARY);
        config.harvest_interval = form.value("interval").to_string();

        match write_config(&path, &config) {
            Ok(()) => {
                self.log(LogScope::Harvest, "Configuration saved");
                let _ = self.reload.send(ReloadSignal);
            }
            Err(e) => self.log(LogScope::Harvest, format!("Failed to save config: {}", e)),
        }
    }

    fn create_wallet(&mut self) {
        let password = self.wallet_form.value("password").to_string();
        let confirm = self.wallet_form.value("confirm").to_string();
        self.wallet_form.clear("password");
        self.wallet_form.clear("confirm");

        match self.ctx.store.create(&password, &confirm) {
            Ok(CreateOutcome::Created { public_key, .. }) => {
                self.log(LogScope::Wallet, format!("New wallet created: {}", public_key));
                self.log(LogScope::Wallet, "Login with your password to use it");
            }
            Ok(CreateOutcome::Existing { prefix, .. }) => {
                self.log(LogScope::Wallet, format!("Wallet already exists: {}...", prefix));
            }
            Err(e) => self.log(LogScope::Wallet, format!("Error: {}", e)),
        }
    }

    fn login(&mut self) {
        let password = self.wallet_form.value("login").to_string();
        self.wallet_form.clear("login");

        match self.ctx.store.unlock(&password) {
            Ok(Some(credentials)) => {
                let public_key = credentials.public_key().to_string();
                self.ctx.wallet.unlock(credentials);
                self.log(LogScope::Wallet, format!("Login successful: {}", public_key));

                let dashboard = self.dashboard.clone();
                thread::spawn(move || dashboard.refresh_all());
            }
            Ok(None) => self.log(LogScope::Wallet, "Incorrect password"),
            Err(e) => self.log(LogScope::Wallet, format!("Error: {}", e)),
        }
    }

    fn export_public_key(&mut self) {
        let Some(credentials) = self.ctx.wallet.current() else {
            self.log(LogScope::Wallet, "Please login to your wallet first");
            return;
        };
        match self.ctx.store.export_public_key(&credentials) {
            Ok(path) => self.log(LogScope::Wallet, format!("Public key exported to {}", path.display())),
            Err(e) => self.log(LogScope::Wallet, format!("Error: {}", e)),
        }
    }

    fn export_private_key(&mut self) {
        let password = self.wallet_form.value("export_password").to_string();
        self.wallet_form.clear("export_password");

        let Some(credentials) = self.ctx.wallet.current() else {
            self.log(LogScope::Wallet, "Please login to your wallet first");
            return;
        };
        if password.is_empty() {
            self.log(LogScope::Wallet, "Please enter your password to export the private key");
            return;
        }

        match self.ctx.store.export_private_key(&credentials, &password) {
            Ok(path) => self.log(LogScope::Wallet, format!("Private key exported to {}", path.display())),
            Err(crate::error::WalletError::Locked) => self.log(LogScope::Wallet, "Incorrect password"),
            Err(e) => self.log(LogScope::Wallet, format!("Error: {}", e)),
        }
    }

    /// Kill every miner, drop the keys and leave the event loop
    pub fn shutdown(&mut self) {
        tracing::info!("[App] Quit requested, stopping miners");
        for supervisor in &self.supervisors {
            supervisor.stop();
        }
        self.ctx.wallet.logout();
        self.should_quit = true;
    }
}

fn miner_form(index: usize, supervisor: &MinerSupervisor) -> Form {
    let backend = supervisor.backend();
    let defaults = backend.default_params();
    let labels: Vec<&str> = backend.algorithms.iter().map(|a| a.label).collect();
    let default_index = labels.iter().position(|l| *l == defaults.algorithm).unwrap_or(0);

    let mut form = Form::new(backend.scope.title())
        .select("algorithm", "Mining Algorithm", &labels, default_index)
        .select("port", "Port", backend.ports, 0)
        .text("worker", "Worker Name", &defaults.worker);
    if backend.uses_threads {
        form = form.text("threads", "Threads", &defaults.threads.to_string());
    }
    form.button("Start Mining", Action::StartMining(index))
        .button("Stop Mining", Action::StopMining(index))
}

fn harvest_form(config: &HarvestConfig) -> Form {
    let symbols = HarvestToken::ALL.map(HarvestToken::symbol);
    let token_index = HarvestToken::ALL
        .iter()
        .position(|t| *t == config.token_to_harvest)
        .unwrap_or(0);
    let intervals = HarvestInterval::ALL.map(HarvestInterval::as_str);
    let interval_index = intervals
        .iter()
        .position(|i| *i == config.harvest_interval)
        .unwrap_or(0);

    Form::new("Auto Harvest")
        .text("sol_per_harvest", "SOL per Harvest", &config.sol_per_harvest.to_string())
        .select("token", "Token to Harvest", &symbols, token_index)
        .select("interval", "Harvest Interval", &intervals, interval_index)
        .button("Save", Action::SaveHarvestConfig)
        .text("manual_sol", "Manual SOL Amount", "0.001")
        .select("manual_token", "Manual Token", &symbols, 0)
        .button("Harvest", Action::ManualHarvest)
}

fn wallet_form() -> Form {
    Form::new("Wallet")
        .password("password", "Password (min 8 characters)")
        .password("confirm", "Confirm Password")
        .button("Create Wallet", Action::CreateWallet)
        .password("login", "Password")
        .button("Login", Action::Login)
        .button("Export Public Key", Action::ExportPublicKey)
        .password("export_password", "Password for private key export")
        .button("Export Private Key", Action::ExportPrivateKey)
        .button("Logout", Action::Logout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BalanceReader;
    use crate::context::AppPaths;
    use crate::error::{ChainError, PoolError};
    use crate::event::LogSink;
    use crate::exchange::PriceCache;
    use crate::harvest::harvester::tests::StubExchange;
    use crate::miner::BACKENDS;
    use crate::pool::PoolStatsSource;
    use chrono::Local;
    use crossterm::event::KeyModifiers;
    use std::sync::mpsc::channel;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct NoChain;

    impl BalanceReader for NoChain {
        fn native_balance(&self, _: &str) -> Result<f64, ChainError> {
            Err(ChainError::InvalidResponse("offline".into()))
        }
        fn token_balances(&self, _: &str) -> Result<Vec<TokenBalance>, ChainError> {
            Err(ChainError::InvalidResponse("offline".into()))
        }
    }

    impl PoolStatsSource for NoChain {
        fn fetch_stats(&self, _: &str) -> Result<PoolStats, PoolError> {
            Err(PoolError::InvalidResponse("offline".into()))
        }
    }

    fn app(dir: &TempDir) -> (App, Receiver<ReloadSignal>) {
        let (sink, events) = LogSink::channel();
        let ctx = AppContext::new(AppPaths::new(dir.path()), sink.clone());
        let supervisors = BACKENDS
            .into_iter()
            .map(|b| MinerSupervisor::new(b, sink.clone()))
            .collect();
        let harvester = Harvester::new(
            ctx.wallet.clone(),
            Arc::new(NoChain),
            Arc::new(StubExchange::default()),
            PriceCache::default(),
            sink.clone(),
        );
        let dashboard = DashboardRefresher::new(ctx.wallet.clone(), Arc::new(NoChain), Arc::new(NoChain), sink);
        let (reload_tx, reload_rx) = channel();
        (App::new(ctx, supervisors, harvester, dashboard, reload_tx, events), reload_rx)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_menu_maps_to_screens() {
        let dir = TempDir::new().unwrap();
        let (mut app, _reload) = app(&dir);

        assert_eq!(app.screen(), Some(Screen::Dashboard));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.screen(), Some(Screen::Miner(0)));
        app.menu.select(Some(4));
        assert_eq!(app.screen(), Some(Screen::Harvest));
        app.menu.select(Some(5));
        assert_eq!(app.screen(), Some(Screen::Wallet));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.screen(), None);
        press(&mut app, KeyCode::Down);
        assert_eq!(app.screen(), Some(Screen::Dashboard));
    }

    #[test]
    fn test_log_buffer_is_bounded() {
        let dir = TempDir::new().unwrap();
        let (mut app, _reload) = app(&dir);

        for i in 0..LOG_CAPACITY + 5 {
            app.apply(UiEvent::Log {
                scope: LogScope::Cpu,
                at: Local::now(),
                line: format!("line {}", i),
            });
        }
        let lines: Vec<&String> = app.log_lines(LogScope::Cpu).collect();
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert!(lines[0].ends_with("line 5"));
        assert_eq!(app.log_lines(LogScope::Wallet).count(), 0);
    }

    #[test]
    fn test_save_config_writes_file_and_signals_reload() {
        let dir = TempDir::new().unwrap();
        let (mut app, reload) = app(&dir);

        app.menu.select(Some(4));
        press(&mut app, KeyCode::Enter);
        for _ in 0..5 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "0.002");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);

        let config = read_config(&app.ctx.paths.config_file()).unwrap();
        assert_eq!(config.sol_per_harvest, 0.002);
        assert_eq!(config.token_to_harvest, HarvestToken::Xencat);
        assert_eq!(config.harvest_interval, "10m");
        assert_eq!(reload.try_recv(), Ok(ReloadSignal));
    }

    #[test]
    fn test_wallet_create_and_login_flow() {
        let dir = TempDir::new().unwrap();
        let (mut app, _reload) = app(&dir);

        app.menu.select(Some(5));
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "hunter2hunter2");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "hunter2hunter2");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);
        assert!(app.ctx.store.find_wallet_file().is_some());
        assert_eq!(app.wallet_form.value("password"), "");

        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "wrong-password");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Enter);
        assert!(!app.ctx.wallet.is_unlocked());

        app.wallet_form.set_text("login", "hunter2hunter2");
        app.perform(Action::Login);
        assert!(app.ctx.wallet.is_unlocked());

        app.perform(Action::Logout);
        assert!(!app.ctx.wallet.is_unlocked());
    }

    #[test]
    fn test_q_types_into_text_fields_but_quits_elsewhere() {
        let dir = TempDir::new().unwrap();
        let (mut app, _reload) = app(&dir);

        app.menu.select(Some(5));
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "qqqq");
        assert!(!app.should_quit());
        assert_eq!(app.wallet_form.value("password"), "qqqq");

        press(&mut app, KeyCode::Esc);
        type_text(&mut app, "qqqq");
        assert!(app.should_quit());
    }

    #[test]
    fn test_start_mining_requires_login() {
        let dir = TempDir::new().unwrap();
        let (mut app, _reload) = app(&dir);

        app.perform(Action::StartMining(0));
        assert!(!app.supervisors[0].is_active());
        app.drain_events();
        let lines: Vec<&String> = app.log_lines(LogScope::Cpu).collect();
        assert!(lines[0].ends_with("Please login to your wallet first"));
    }
}
