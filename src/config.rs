//! Configuração do fluxo de renovação carregada a partir de `renewal.toml`.
//!
//! A struct [`RenewalConfig`] contém os atrasos entre estágios e os parâmetros
//! da política de decisão. Valores não presentes no arquivo usam defaults.
//! A variável de ambiente `RENEWAL_SEED` tem precedência sobre o arquivo.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::engine::EngineConfig;
use crate::error::{RenewalError, Result};
use crate::policy::RandomPolicy;

/// Nome do arquivo de configuração procurado no diretório atual.
pub const CONFIG_FILE: &str = "renewal.toml";

/// Configuração de nível superior carregada de `renewal.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenewalConfig {
    /// Atraso entre entrar num estágio de lembrete e enviar o e-mail (D1).
    #[serde(default = "default_reminder_delay_ms")]
    pub reminder_delay_ms: u64,

    /// Tempo de espera por uma renovação após cada lembrete (D2).
    #[serde(default = "default_wait_delay_ms")]
    pub wait_delay_ms: u64,

    /// Probabilidade de renovação em cada verificação.
    #[serde(default = "default_success_probability")]
    pub success_probability: f64,

    /// Semente do gerador aleatório; sem semente o resultado não é reprodutível.
    #[serde(default)]
    pub seed: Option<u64>,
}

// Valor padrão para D1: 2000ms.
fn default_reminder_delay_ms() -> u64 {
    2000
}

// Valor padrão para D2: 4000ms.
fn default_wait_delay_ms() -> u64 {
    4000
}

fn default_success_probability() -> f64 {
    0.5
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            reminder_delay_ms: default_reminder_delay_ms(),
            wait_delay_ms: default_wait_delay_ms(),
            success_probability: default_success_probability(),
            seed: None,
        }
    }
}

impl RenewalConfig {
    /// Carrega a configuração de `renewal.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<RenewalConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para a semente.
        config.apply_seed_override(std::env::var("RENEWAL_SEED").ok())?;

        config.validate()?;
        Ok(config)
    }

    /// Aplica o valor bruto de `RENEWAL_SEED`, se presente e não vazio.
    fn apply_seed_override(&mut self, raw: Option<String>) -> Result<()> {
        if let Some(raw) = raw
            && !raw.is_empty()
        {
            let seed = raw.parse::<u64>().map_err(|e| {
                RenewalError::Config(format!("RENEWAL_SEED is not a valid u64: {e}"))
            })?;
            self.seed = Some(seed);
        }
        Ok(())
    }

    /// Rejeita valores que a política ou o motor não aceitam.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.success_probability) {
            return Err(RenewalError::Config(format!(
                "success_probability must be within [0, 1], got {}",
                self.success_probability
            )));
        }
        Ok(())
    }

    /// Atrasos do motor derivados desta configuração.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            reminder_delay: Duration::from_millis(self.reminder_delay_ms),
            wait_delay: Duration::from_millis(self.wait_delay_ms),
        }
    }

    /// Política aleatória parametrizada por esta configuração.
    pub fn random_policy(&self) -> Result<RandomPolicy> {
        RandomPolicy::new(self.success_probability, self.seed)
    }
}
