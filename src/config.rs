//! Loading prompt configuration from TOML.
//!
//! See `PromptsConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Text blocks used to assemble generation prompts. Defaults carry the
/// production wording; override them in TOML to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  /// System message for chat-completion calls.
  pub system: String,
  /// Preamble demanding a strict JSON-only reply.
  pub preamble: String,
  /// Answer-format section appended after the structure block.
  pub answer_format: String,
  /// Fallback line used when no textbooks were resolved.
  pub no_textbooks: String,
  /// First message posted into a freshly created thread.
  pub thread_seed: String,
  /// Workspace chat template; `{workspace}` and `{message}` are filled in.
  pub chat_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You are a helpful assistant.".into(),
      preamble: r#"Ты — умный ИИ, специализирующийся на генерации тестовых заданий.

**ВАЖНО**:
- Твоё сообщение-ответ **должно быть строго в формате JSON** — никаких комментариев или пояснений вне JSON.
- Все комментарии, которые ты хочешь дать (или уточнения), должны находиться внутри поля "comments".
- Ты не имеешь права добавлять текст вне фигурных скобок JSON. Никакого префикса, постфикса, пожалуйста.

Твоя задача:
1) Создать тест (поле "material") и правильные ответы (поле "answers") в соответствии с нижеприведённой структурой.
2) Все твои комментарии/объяснения помести в ключ "comments" внутри JSON.
3) Итоговая структура ответа в точности такая:
```
{
  "material": "...",
  "answers": "...(или объект)",
  "comments": "..."
}
```"#
        .into(),
      answer_format: r#"### Формат ответа

**Внимание**: Ответ ДОЛЖЕН быть ТОЛЬКО valid JSON. Пример желаемой структуры:
```
{
  "material": "Здесь сам тест (включая все блоки)...",
  "answers": {
    "Блок #1": ["ответ1", "ответ2"],
    "Блок #2": ["ответ1", "ответ2"]
  },
  "comments": "Любые комментарии ИИ пишешь тут"
}
```

**Запрещено** писать что-либо вне JSON-структуры. Если у тебя нет комментариев — сделай пустую строку в поле "comments".

Пожалуйста, сгенерируй тест строго по заданной структуре, используя информацию из приложенных учебников, если они доступны.
Если учебники не найдены, опирайся на общие знания, но всё равно соблюдай формат."#
        .into(),
      no_textbooks:
        "Нет найденных учебников по данному параметру. Используй общие знания (но все равно отвечай строго по формату)."
          .into(),
      thread_seed: "Начало сеанса для генерации тестов.".into(),
      chat_template: "Workspace: \"{workspace}\"\nMessage: \"{message}\"".into(),
    }
  }
}

/// Attempt to load `PromptsConfig` from PROMPTS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_prompts_config_from_env() -> Option<PromptsConfig> {
  let path = std::env::var("PROMPTS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<PromptsConfig>(&s) {
      Ok(cfg) => {
        info!(target: "neurolab_backend", %path, "Loaded prompts config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "neurolab_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "neurolab_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
