//! Built-in content: the placement test, the practice bank, placeholder
//! vocabulary and the mock leaderboard. Guarantees the app is usable without
//! external config or an AI key.

use uuid::Uuid;

use crate::domain::{AnswerOption as O, ProficiencyLevel, Question, QuestionType, UserProfile};

/// Words returned while vocabulary suggestions are not AI-backed.
pub const PLACEHOLDER_WORDS: &[&str] = &[
  "Serendipity", "Ephemeral", "Ubiquitous", "Eloquent", "Resilient",
  "Meticulous", "Pragmatic", "Ambiguous", "Candid", "Diligent",
];

fn q(id: &str, kind: QuestionType, text: &str, options: Vec<O>) -> Question {
  match Question::new(id, kind, text, options) {
    Ok(q) => q,
    // Static content, covered by the seed tests below.
    Err(e) => panic!("invalid built-in question: {e}"),
  }
}

/// The 10-question placement test. Every item carries a translation or an
/// explanation, so each one allows a second attempt.
pub fn level_test_questions() -> Vec<Question> {
  use QuestionType::*;
  vec![
    q("lt-1", Vocabulary, "What is the meaning of \"apple\"?",
      vec![O::right("Manzana"), O::wrong("Pera"), O::wrong("Naranja"), O::wrong("Uva")])
      .with_translation("¿Qué significa \"apple\"?"),
    q("lt-2", Grammar, "She ___ to school every day.",
      vec![O::wrong("go"), O::right("goes"), O::wrong("going"), O::wrong("gone")])
      .with_explanation("Third person singular in the present simple takes -s: she goes."),
    q("lt-3", Vocabulary, "Choose the synonym of \"happy\".",
      vec![O::wrong("Sad"), O::wrong("Angry"), O::right("Glad"), O::wrong("Tired")])
      .with_translation("Elige el sinónimo de \"happy\" (feliz)."),
    q("lt-4", Grammar, "I have lived here ___ 2015.",
      vec![O::wrong("for"), O::right("since"), O::wrong("during"), O::wrong("from")])
      .with_explanation("Use \"since\" with a point in time and \"for\" with a duration."),
    q("lt-5", Vocabulary, "What is the opposite of \"expensive\"?",
      vec![O::right("Cheap"), O::wrong("Costly"), O::wrong("Rich"), O::wrong("Valuable")])
      .with_translation("¿Cuál es lo contrario de \"expensive\" (caro)?"),
    q("lt-6", Grammar, "If I ___ you, I would study more.",
      vec![O::wrong("am"), O::wrong("was being"), O::right("were"), O::wrong("be")])
      .with_explanation("Second conditional uses \"were\" for all persons."),
    q("lt-7", Vocabulary, "\"Reliable\" means...",
      vec![O::wrong("Unpredictable"), O::right("Dependable"), O::wrong("Lazy"), O::wrong("Noisy")])
      .with_translation("\"Reliable\" significa \"confiable\"."),
    q("lt-8", Grammar, "By the time we arrived, the film ___.",
      vec![O::wrong("already started"), O::right("had already started"), O::wrong("has already started"), O::wrong("starts")])
      .with_explanation("An action completed before another past action uses the past perfect."),
    q("lt-9", Vocabulary, "Which word means \"to make something worse\"?",
      vec![O::wrong("Alleviate"), O::wrong("Improve"), O::right("Exacerbate"), O::wrong("Mitigate")])
      .with_translation("¿Qué palabra significa \"empeorar algo\"?"),
    q("lt-10", Grammar, "Hardly ___ the door when the phone rang.",
      vec![O::wrong("I had opened"), O::right("had I opened"), O::wrong("I opened"), O::wrong("did I opened")])
      .with_explanation("Negative adverbials at the start of a clause trigger inversion."),
  ]
}

/// Practice bank used for mock question generation. Some items have nothing
/// to reveal and therefore allow a single attempt.
pub fn practice_bank() -> Vec<Question> {
  use QuestionType::*;
  vec![
    q("pr-1", Vocabulary, "Translate \"library\".",
      vec![O::wrong("Librería"), O::right("Biblioteca"), O::wrong("Libro"), O::wrong("Lectura")])
      .with_explanation("\"Library\" is a false friend: a \"librería\" is a bookshop."),
    q("pr-2", Vocabulary, "Translate \"to borrow\".",
      vec![O::right("Pedir prestado"), O::wrong("Prestar"), O::wrong("Comprar"), O::wrong("Devolver")])
      .with_translation("Borrow = pedir prestado; lend = prestar."),
    q("pr-3", Vocabulary, "What does \"actually\" mean?",
      vec![O::wrong("Actualmente"), O::right("En realidad"), O::wrong("Ahora"), O::wrong("Pronto")])
      .with_explanation("\"Actually\" means \"in fact\", not \"currently\"."),
    q("pr-4", Vocabulary, "Pick the word for \"cocina\".",
      vec![O::right("Kitchen"), O::wrong("Chicken"), O::wrong("Kitten"), O::wrong("Cooker")]),
    q("pr-5", Vocabulary, "Pick the word for \"tenedor\".",
      vec![O::wrong("Spoon"), O::wrong("Knife"), O::right("Fork"), O::wrong("Plate")]),
    q("pr-6", Vocabulary, "\"Embarrassed\" means...",
      vec![O::wrong("Embarazada"), O::right("Avergonzado"), O::wrong("Enojado"), O::wrong("Cansado")])
      .with_explanation("\"Embarrassed\" is avergonzado; \"pregnant\" is embarazada."),
    q("pr-7", Grammar, "There ___ many people at the party.",
      vec![O::wrong("was"), O::right("were"), O::wrong("is"), O::wrong("be")])
      .with_explanation("\"People\" is plural, so use \"were\"."),
    q("pr-8", Grammar, "He is ___ honest man.",
      vec![O::wrong("a"), O::right("an"), O::wrong("the"), O::wrong("-")])
      .with_explanation("\"Honest\" starts with a vowel sound, so use \"an\"."),
    q("pr-9", Grammar, "I'm looking forward to ___ you.",
      vec![O::wrong("see"), O::right("seeing"), O::wrong("saw"), O::wrong("seen")])
      .with_translation("Tengo ganas de verte."),
    q("pr-10", Grammar, "Choose the correct question.",
      vec![O::right("Where do you live?"), O::wrong("Where you live?"), O::wrong("Where does you live?"), O::wrong("Where living you?")]),
    q("pr-11", Grammar, "She has been working here ___ three years.",
      vec![O::right("for"), O::wrong("since"), O::wrong("from"), O::wrong("ago")])
      .with_explanation("Durations take \"for\"."),
    q("pr-12", Vocabulary, "Pick the word for \"sabio\".",
      vec![O::wrong("Wide"), O::right("Wise"), O::wrong("White"), O::wrong("Wire")]),
  ]
}

/// Fresh mock profile for a newly signed-in user.
pub fn default_profile(name: &str, email: &str) -> UserProfile {
  UserProfile {
    id: Uuid::new_v4().to_string(),
    name: name.to_string(),
    email: email.to_string(),
    avatar_url: format!("https://api.dicebear.com/7.x/initials/svg?seed={}", name.replace(' ', "+")),
    level: 1,
    xp: 0,
    words_learned: 0,
    consecutive_days: 1,
    current_vocabulary_level: ProficiencyLevel::Novato,
    learning_goals: vec!["Ampliar vocabulario".into()],
  }
}

/// Other learners shown on the progress page: (name, xp).
pub fn mock_leaderboard() -> Vec<(&'static str, u32)> {
  vec![
    ("María G.", 1450),
    ("Carlos R.", 1210),
    ("Lucía P.", 980),
    ("Diego M.", 640),
    ("Sofía L.", 320),
  ]
}
