//! Interface de linha de comando do fluxo de renovação baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, simulate, stages)
//! e flags globais que sobrescrevem valores de `renewal.toml`.

use clap::{Parser, Subcommand};

use renewal_flow::config::RenewalConfig;

/// Simulador do fluxo de lembretes de renovação de assinatura.
#[derive(Debug, Parser)]
#[command(name = "renewal-flow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Atraso antes de cada lembrete, em milissegundos.
    #[arg(long, global = true)]
    pub reminder_delay_ms: Option<u64>,

    /// Espera por renovação após cada lembrete, em milissegundos.
    #[arg(long, global = true)]
    pub wait_delay_ms: Option<u64>,

    /// Probabilidade de renovação em cada verificação (0.0 a 1.0).
    #[arg(long, global = true)]
    pub probability: Option<f64>,

    /// Semente do gerador aleatório.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Emite os logs de diagnóstico em JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa um fluxo e mostra cada etapa conforme acontece.
    Run,

    /// Executa vários fluxos independentes em paralelo e mostra a contagem.
    Simulate {
        /// Número de fluxos a executar.
        #[arg(long, default_value_t = 10)]
        runs: usize,
    },

    /// Lista os estágios do fluxo em ordem.
    Stages,
}

impl Cli {
    /// Aplica as flags globais sobre a configuração carregada do arquivo.
    pub fn apply_overrides(&self, config: &mut RenewalConfig) {
        if let Some(ms) = self.reminder_delay_ms {
            config.reminder_delay_ms = ms;
        }
        if let Some(ms) = self.wait_delay_ms {
            config.wait_delay_ms = ms;
        }
        if let Some(p) = self.probability {
            config.success_probability = p;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
    }
}
