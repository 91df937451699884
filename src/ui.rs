//! Interface de terminal do fluxo de renovação: spinner e saída colorida.
//!
//! Usa as crates `indicatif` para o spinner e `console` para estilização com
//! cores. O [`FlowProgress`] é um consumidor externo do motor: recebe
//! snapshots do estado e apenas os renderiza.

use std::time::Duration;

use chrono::Local;
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use renewal_flow::state_machine::{EngineState, LogCategory, LogEntry, Outcome, RunSummary, Stage};

/// Indicador visual de progresso de um fluxo no terminal.
///
/// Exibe um spinner com o estágio atual e imprime cada nova entrada do log
/// com a cor da sua categoria.
pub struct FlowProgress {
    // Spinner do indicatif.
    pb: ProgressBar,
    // Quantas entradas do log já foram impressas.
    printed: usize,
    green: Style,
    red: Style,
    yellow: Style,
    blue: Style,
    dim: Style,
}

impl FlowProgress {
    /// Inicia o spinner e retorna a instância de progresso.
    pub fn start() -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(Stage::Idle.label());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            printed: 0,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            blue: Style::new().blue(),
            dim: Style::new().dim(),
        }
    }

    /// Renderiza um snapshot: atualiza o estágio e imprime entradas novas.
    pub fn render(&mut self, state: &EngineState) {
        // Um reset esvazia o log; recomeça a contagem.
        if state.log.len() < self.printed {
            self.printed = 0;
        }
        for entry in state.log.entries().iter().skip(self.printed) {
            self.pb.println(self.format_entry(entry));
        }
        self.printed = state.log.len();
        self.pb.set_message(format!(
            "{} ({}/{})",
            state.stage.label(),
            state.stage.rank(),
            Stage::Completed.rank()
        ));
    }

    fn format_entry(&self, entry: &LogEntry) -> String {
        let style = match entry.category() {
            LogCategory::Success => &self.green,
            LogCategory::Error => &self.red,
            LogCategory::Warning => &self.yellow,
            LogCategory::Start | LogCategory::Info => &self.blue,
        };
        let time = entry.created_at().with_timezone(&Local).format("%H:%M:%S");
        format!(
            "  {} {}",
            self.dim.apply_to(time),
            style.apply_to(entry.message())
        )
    }

    /// Finaliza o spinner e exibe o resultado do fluxo.
    pub fn complete(&self, outcome: Option<Outcome>) {
        self.pb.finish_and_clear();
        match outcome {
            Some(Outcome::Success) => {
                println!("  {} Subscription renewed", self.green.apply_to("✓"));
            }
            Some(Outcome::Failed) => {
                println!("  {} Subscription not renewed", self.red.apply_to("✗"));
            }
            None => {
                println!("  {} Flow reset before completion", self.yellow.apply_to("↺"));
            }
        }
    }

    /// Imprime o resumo da execução formatado em JSON.
    pub fn print_summary(&self, summary: &RunSummary) {
        let style = match summary.outcome {
            Outcome::Success => &self.green,
            Outcome::Failed => &self.red,
        };
        println!();
        println!("{}", style.apply_to("─── Run Summary ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(summary).unwrap_or_default()
        );
    }
}

/// Contagem de resultados de várias execuções independentes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tally {
    pub renewed_early: usize,
    pub renewed_late: usize,
    pub failed: usize,
}

impl Tally {
    pub fn record(&mut self, summary: &RunSummary) {
        match (summary.outcome, summary.reminders_sent) {
            (Outcome::Success, 1) => self.renewed_early += 1,
            (Outcome::Success, _) => self.renewed_late += 1,
            (Outcome::Failed, _) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.renewed_early + self.renewed_late + self.failed
    }

    /// Imprime a contagem com cores.
    pub fn print(&self) {
        let green = Style::new().green().bold();
        let red = Style::new().red().bold();
        println!("Runs:                  {}", self.total());
        println!(
            "Renewed after first:   {}",
            green.apply_to(self.renewed_early)
        );
        println!(
            "Renewed after second:  {}",
            green.apply_to(self.renewed_late)
        );
        println!("Not renewed:           {}", red.apply_to(self.failed));
    }
}
