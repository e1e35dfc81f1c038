//! Prompt assembly: difficulty descriptors and the instruction document
//! sent to the model.

use crate::config::Prompts;
use crate::protocol::GenerateIn;

/// Fixed difficulty scale; levels outside 0..=4 fall back to "Нормальный".
const DIFFICULTY_LEVELS: [(&str, &str); 5] = [
  (
    "Очень лёгкий",
    "Тестовые задания с простыми, базовыми вопросами, не требующими глубокого анализа.",
  ),
  (
    "Лёгкий",
    "Задания, в основном проверяющие базовые знания, но чуть более детализированные, чем очень лёгкий.",
  ),
  (
    "Нормальный",
    "Стандартная сложность: часть заданий на базу, часть — на применение знаний.",
  ),
  (
    "Сложный",
    "Углублённые вопросы, требующие логического мышления и анализа, могут быть дополнительные подводящие шаги.",
  ),
  (
    "Очень сложный",
    "Комплексные задачи с несколькими этапами решения и требующие глубоких знаний и аналитики.",
  ),
];

/// Name and explanation for a difficulty level.
pub fn difficulty_info(level: i64) -> (&'static str, &'static str) {
  let idx = if (0..=4).contains(&level) { level as usize } else { 2 };
  DIFFICULTY_LEVELS[idx]
}

/// Render the instruction document for one generation request.
///
/// The builder trusts the caller-supplied fields and embeds them verbatim;
/// only the difficulty level goes through the fixed table. An empty
/// textbook list renders the general-knowledge fallback line instead.
pub fn build_prompt(prompts: &Prompts, req: &GenerateIn, textbooks: &[String]) -> String {
  let (difficulty_name, difficulty_explanation) = difficulty_info(req.difficulty_level);

  let textbook_list = if textbooks.is_empty() {
    prompts.no_textbooks.clone()
  } else {
    textbooks.iter().map(|f| format!("- {}", f)).collect::<Vec<_>>().join("\n")
  };

  let structure = req
    .test_constructor
    .iter()
    .enumerate()
    .map(|(idx, block)| {
      format!(
        "Блок #{}:\n  - Количество вопросов: {}\n  - Тип вопроса: {} (ответы: {})\n  - Баллы: {}\n",
        idx + 1,
        block.questions,
        block.question_type,
        block.answers_type,
        block.points
      )
    })
    .collect::<Vec<_>>()
    .join("\n");

  let author = match req.author.as_deref() {
    Some(a) if !a.is_empty() => a.to_string(),
    _ => "Любой автор из списка, если есть несколько.".to_string(),
  };

  format!(
    "{preamble}\n\n\
     ### Исходные данные\n\n\
     1) Язык отделения (обучения): {lang}\n\
     2) Класс: {grade}\n\
     3) Предмет: {subject}\n\
     4) Автор: {author}\n\
     5) Тема: {theme}\n\
     6) Уровень сложности: {difficulty}\n\
     \u{20}  - Подробности: {difficulty_explanation}\n\
     7) Пользовательские настройки: {custom}\n\n\
     Учебники (PDF) для использования:\n{textbooks}\n\n\
     Структура теста:\n{structure}\n\n\
     {answer_format}",
    preamble = prompts.preamble,
    lang = req.edu_lang.to_uppercase(),
    grade = req.class_level,
    subject = req.subject_name,
    author = author,
    theme = req.theme,
    difficulty = difficulty_name,
    difficulty_explanation = difficulty_explanation,
    custom = req.custom_settings,
    textbooks = textbook_list,
    structure = structure,
    answer_format = prompts.answer_format,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::TestBlock;

  fn request() -> GenerateIn {
    GenerateIn {
      edu_lang: "rus".into(),
      class_level: "9".into(),
      subject_code: "BIO".into(),
      subject_name: "Биология".into(),
      author: None,
      theme: "Клетка".into(),
      difficulty_level: 2,
      custom_settings: "Без рисунков".into(),
      test_constructor: vec![TestBlock {
        questions: "10".into(),
        question_type: "closed".into(),
        answers_type: "single".into(),
        points: "1".into(),
      }],
      thread_id: None,
    }
  }

  #[test]
  fn out_of_range_difficulty_falls_back_to_normal() {
    assert_eq!(difficulty_info(7), difficulty_info(2));
    assert_eq!(difficulty_info(-1), difficulty_info(2));
    assert_eq!(difficulty_info(0).0, "Очень лёгкий");
    assert_eq!(difficulty_info(4).0, "Очень сложный");
  }

  #[test]
  fn textbooks_are_listed_verbatim_one_per_line() {
    let prompts = Prompts::default();
    let files = vec![
      "BIO_9_RUS_2019_Петров_1".to_string(),
      "BIO_9_RUS_2019_Петров_2".to_string(),
      "CHEM_9_RUS_2020_Сидоров".to_string(),
    ];
    let prompt = build_prompt(&prompts, &request(), &files);
    assert!(prompt.contains("- BIO_9_RUS_2019_Петров_1\n- BIO_9_RUS_2019_Петров_2\n- CHEM_9_RUS_2020_Сидоров"));
  }

  #[test]
  fn empty_textbook_list_uses_fallback_line() {
    let prompts = Prompts::default();
    let prompt = build_prompt(&prompts, &request(), &[]);
    assert!(prompt.contains(&prompts.no_textbooks));
    assert!(!prompt.contains("- BIO"));
  }

  #[test]
  fn caller_fields_are_embedded_untouched() {
    let prompts = Prompts::default();
    let mut req = request();
    req.author = Some("Петров 2019".into());
    let prompt = build_prompt(&prompts, &req, &[]);
    assert!(prompt.contains("Язык отделения (обучения): RUS"));
    assert!(prompt.contains("Класс: 9"));
    assert!(prompt.contains("Автор: Петров 2019"));
    assert!(prompt.contains("Тема: Клетка"));
    assert!(prompt.contains("Пользовательские настройки: Без рисунков"));
    assert!(prompt.contains("Уровень сложности: Нормальный"));
  }

  #[test]
  fn unset_author_renders_any_author_fallback() {
    let prompts = Prompts::default();
    let prompt = build_prompt(&prompts, &request(), &[]);
    assert!(prompt.contains("Автор: Любой автор из списка, если есть несколько."));
  }

  #[test]
  fn constructor_blocks_are_rendered_in_order() {
    let prompts = Prompts::default();
    let mut req = request();
    req.test_constructor.push(TestBlock {
      questions: "5".into(),
      question_type: "open".into(),
      answers_type: "complex".into(),
      points: "3".into(),
    });
    let prompt = build_prompt(&prompts, &req, &[]);
    let first = prompt.find("Блок #1:").expect("first block");
    let second = prompt.find("Блок #2:").expect("second block");
    assert!(first < second);
    assert!(prompt.contains("Количество вопросов: 5"));
    assert!(prompt.contains("Тип вопроса: open (ответы: complex)"));
    assert!(prompt.contains("Баллы: 3"));
  }
}
