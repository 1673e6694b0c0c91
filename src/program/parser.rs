//! Program Parser
//!
//! Turns the textual program format into an [`ExerciseProgram`]. Parsing
//! either succeeds completely or fails before anything is executed.
//!
//! The format is line-oriented: one statement per line, keywords are
//! case-insensitive and tokens are separated by runs of spaces or tabs.
//! Blank lines and lines starting with `//` are ignored.
//!
//! | Statement                      | Meaning                                  |
//! |--------------------------------|------------------------------------------|
//! | `# <name>`                     | program title (must come first)          |
//! | `## <name>`                    | starts an exercise                       |
//! | `<N> sets x <M> reps`          | volume of the current exercise           |
//! | `Prepare for <duration>`       | announced wait before the first set      |
//! | `Wait for <duration>`          | wait performed in every repetition       |
//! | `Wait for <duration> saying X` | prompted wait performed in every rep     |
//! | `Rest for <duration>`          | announced wait between sets              |
//!
//! Durations combine hours, minutes and seconds in that order, e.g. `1h 2m 5s`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, digit1, one_of, space0, space1};
use nom::combinator::{all_consuming, map, map_res, opt, rest, verify};
use nom::multi::separated_list1;
use nom::sequence::{pair, preceded, terminated, tuple};
use nom::IResult;
use thiserror::Error;

use super::model::{Exercise, ExerciseProgram, ExerciseRef};
use crate::actions::{
    Action, ExerciseGroupAction, PrepareAction, RepetitionGroupAction, SequenceAction,
    SetGroupAction, WaitAction, WaitWithPromptAction,
};
use crate::services::Services;

/// Prompt spoken at the start of a rest between sets.
pub const REST_PROMPT: &str = "rest";

/// Upper bound on `sets x reps` for a single exercise.
pub const MAX_REPETITIONS: u32 = 10_000;

/// Errors raised while reading or parsing a program.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid duration '{0}' (expected something like '1h 2m 5s')")]
    InvalidDuration(String),

    #[error("failed to read program file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    /// Line the error was found on, for syntax errors.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// A single parsed line.
#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Title(String),
    Exercise(String),
    Volume { sets: u32, repetitions: u32 },
    Prepare(Duration),
    Wait { duration: Duration, prompt: Option<String> },
    Rest(Duration),
}

/// Loads and parses a program file.
///
/// # Example
///
/// ```rust,no_run
/// use workoutrunner::program::load_program;
/// use workoutrunner::services::Services;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let program = load_program("morning.workout", &Services::default())?;
///     println!("Loaded {} exercises", program.len());
///     Ok(())
/// }
/// ```
pub fn load_program(
    path: impl AsRef<Path>,
    services: &Services,
) -> Result<ExerciseProgram, ParseError> {
    let path = path.as_ref();
    info!("Loading program from: {}", path.display());

    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;

    debug!("Program text loaded ({} bytes)", text.len());
    parse_program(&text, services)
}

/// Parses program text, wiring `services` into every leaf action.
pub fn parse_program(text: &str, services: &Services) -> Result<ExerciseProgram, ParseError> {
    let mut title: Option<String> = None;
    let mut drafts: Vec<ExerciseDraft> = Vec::new();
    let mut last_line = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        last_line = line;

        if raw.trim().is_empty() || raw.starts_with("//") {
            continue;
        }

        let statement = parse_statement(raw)
            .ok_or_else(|| ParseError::syntax(line, format!("unrecognised statement '{}'", raw)))?;

        match statement {
            Statement::Title(name) => {
                if title.is_some() {
                    return Err(ParseError::syntax(line, "program title given more than once"));
                }
                title = Some(name);
            }
            _ if title.is_none() => {
                return Err(ParseError::syntax(
                    line,
                    "program must start with a '# <name>' title",
                ));
            }
            Statement::Exercise(name) => drafts.push(ExerciseDraft::new(name, line)),
            other => match drafts.last_mut() {
                Some(draft) => draft.apply(other, line)?,
                None => {
                    return Err(ParseError::syntax(
                        line,
                        "statement appears before the first '## <exercise>'",
                    ))
                }
            },
        }
    }

    let name = title.ok_or_else(|| ParseError::syntax(last_line.max(1), "program has no title"))?;
    if drafts.is_empty() {
        return Err(ParseError::syntax(last_line, "program has no exercises"));
    }

    let exercises = drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| draft.build(index, services))
        .collect::<Result<Vec<_>, _>>()?;

    exercises
        .iter()
        .try_fold(Duration::ZERO, |total, exercise| {
            total.checked_add(exercise.duration())
        })
        .ok_or_else(|| ParseError::syntax(last_line, "program is too long"))?;

    let program = ExerciseProgram::new(name, exercises);
    info!(
        "Parsed program '{}': {} exercises, {:?} total",
        program.name(),
        program.len(),
        program.duration()
    );

    Ok(program)
}

/// Parses a standalone duration such as `1m 30s`.
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    all_consuming(duration)(text.trim())
        .map(|(_, duration)| duration)
        .map_err(|_| ParseError::InvalidDuration(text.to_string()))
}

/// One repetition step as written in the program.
#[derive(Debug, Clone)]
struct RepetitionStep {
    duration: Duration,
    prompt: Option<String>,
}

/// An exercise whose statements are still being collected.
#[derive(Debug)]
struct ExerciseDraft {
    name: String,
    line: usize,
    volume: Option<(u32, u32)>,
    prepare: Option<Duration>,
    rest: Option<Duration>,
    steps: Vec<RepetitionStep>,
}

impl ExerciseDraft {
    fn new(name: String, line: usize) -> Self {
        Self {
            name,
            line,
            volume: None,
            prepare: None,
            rest: None,
            steps: Vec::new(),
        }
    }

    fn apply(&mut self, statement: Statement, line: usize) -> Result<(), ParseError> {
        match statement {
            Statement::Volume { sets, repetitions } => {
                if self.volume.is_some() {
                    return Err(ParseError::syntax(
                        line,
                        format!("exercise '{}' has more than one sets/reps statement", self.name),
                    ));
                }
                if sets == 0 || repetitions == 0 {
                    return Err(ParseError::syntax(
                        line,
                        "set and repetition counts must be at least 1",
                    ));
                }
                if sets
                    .checked_mul(repetitions)
                    .map_or(true, |total| total > MAX_REPETITIONS)
                {
                    return Err(ParseError::syntax(
                        line,
                        format!(
                            "exercise '{}' has more than {} repetitions in total",
                            self.name, MAX_REPETITIONS
                        ),
                    ));
                }
                self.volume = Some((sets, repetitions));
            }
            Statement::Prepare(duration) => {
                if self.prepare.replace(duration).is_some() {
                    return Err(ParseError::syntax(
                        line,
                        format!("exercise '{}' has more than one 'Prepare' statement", self.name),
                    ));
                }
            }
            Statement::Rest(duration) => {
                if self.rest.replace(duration).is_some() {
                    return Err(ParseError::syntax(
                        line,
                        format!("exercise '{}' has more than one 'Rest' statement", self.name),
                    ));
                }
            }
            Statement::Wait { duration, prompt } => {
                self.steps.push(RepetitionStep { duration, prompt });
            }
            Statement::Title(_) | Statement::Exercise(_) => {
                return Err(ParseError::syntax(line, "unexpected header"));
            }
        }
        Ok(())
    }

    /// Builds `Exercise → [Prepare?, Set 1, Rest?, Set 2, …]` where every set
    /// holds its repetitions and every repetition the written steps.
    fn build(self, index: usize, services: &Services) -> Result<Exercise, ParseError> {
        let (sets, repetitions) = self.volume.ok_or_else(|| {
            ParseError::syntax(
                self.line,
                format!("exercise '{}' has no '<N> sets x <M> reps' statement", self.name),
            )
        })?;

        if self.total_duration(sets, repetitions).is_none() {
            return Err(ParseError::syntax(
                self.line,
                format!("exercise '{}' is too long", self.name),
            ));
        }

        let reference = ExerciseRef::new(index, self.name.clone());
        let repetition_body: Vec<Action> = self
            .steps
            .iter()
            .map(|step| -> Action {
                match &step.prompt {
                    Some(prompt) => WaitWithPromptAction::new(
                        services.delay.clone(),
                        services.speech.clone(),
                        step.duration,
                        prompt.clone(),
                    )
                    .into(),
                    None => WaitAction::new(services.delay.clone(), step.duration).into(),
                }
            })
            .collect();
        let repetition_body = SequenceAction::new(repetition_body);

        let mut children: Vec<Action> = Vec::new();
        if let Some(duration) = self.prepare {
            children.push(
                PrepareAction::new(services.delay.clone(), services.speech.clone(), duration).into(),
            );
        }

        for set in 1..=sets {
            if let Some(duration) = self.rest.filter(|_| set > 1) {
                children.push(
                    WaitWithPromptAction::new(
                        services.delay.clone(),
                        services.speech.clone(),
                        duration,
                        REST_PROMPT,
                    )
                    .into(),
                );
            }

            let repetition_actions = (1..=repetitions).map(|repetition| -> Action {
                RepetitionGroupAction::new(repetition, repetition_body.clone()).into()
            });
            children.push(SetGroupAction::new(set, SequenceAction::new(repetition_actions)).into());
        }

        debug!(
            "Exercise '{}': {} sets x {} reps, {} steps per rep",
            self.name,
            sets,
            repetitions,
            self.steps.len()
        );

        let action = ExerciseGroupAction::new(reference.clone(), SequenceAction::new(children));
        Ok(Exercise::new(reference, sets, repetitions, action.into()))
    }

    /// Length of the built exercise, or `None` if it does not fit a `Duration`.
    fn total_duration(&self, sets: u32, repetitions: u32) -> Option<Duration> {
        let repetition = self
            .steps
            .iter()
            .try_fold(Duration::ZERO, |total, step| total.checked_add(step.duration))?;
        let rests = self.rest.unwrap_or_default().checked_mul(sets - 1)?;

        repetition
            .checked_mul(repetitions)?
            .checked_mul(sets)?
            .checked_add(rests)?
            .checked_add(self.prepare.unwrap_or_default())
    }
}

fn parse_statement(line: &str) -> Option<Statement> {
    all_consuming(terminated(statement, space0))(line)
        .ok()
        .map(|(_, statement)| statement)
}

fn statement(input: &str) -> IResult<&str, Statement> {
    alt((
        exercise_header,
        program_title,
        volume,
        prepare,
        rest_period,
        wait,
    ))(input)
}

/// A case-insensitive keyword followed by at least one space or tab.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), space1)
}

fn name_text(input: &str) -> IResult<&str, String> {
    map(verify(rest, |text: &str| !text.trim().is_empty()), |text: &str| {
        text.trim().to_string()
    })(input)
}

fn program_title(input: &str) -> IResult<&str, Statement> {
    map(preceded(pair(char('#'), space1), name_text), Statement::Title)(input)
}

fn exercise_header(input: &str) -> IResult<&str, Statement> {
    map(
        preceded(tuple((char('#'), char('#'), space1)), name_text),
        Statement::Exercise,
    )(input)
}

fn count(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |digits: &str| digits.parse::<u32>())(input)
}

fn volume(input: &str) -> IResult<&str, Statement> {
    map(
        tuple((
            count,
            space1,
            alt((tag_no_case("sets"), tag_no_case("set"))),
            space1,
            tag_no_case("x"),
            space1,
            count,
            space1,
            alt((tag_no_case("reps"), tag_no_case("rep"))),
        )),
        |(sets, _, _, _, _, _, repetitions, _, _)| Statement::Volume { sets, repetitions },
    )(input)
}

fn prepare(input: &str) -> IResult<&str, Statement> {
    map(
        preceded(pair(keyword("prepare"), keyword("for")), duration),
        Statement::Prepare,
    )(input)
}

fn rest_period(input: &str) -> IResult<&str, Statement> {
    map(
        preceded(pair(keyword("rest"), keyword("for")), duration),
        Statement::Rest,
    )(input)
}

fn wait(input: &str) -> IResult<&str, Statement> {
    map(
        tuple((
            keyword("wait"),
            keyword("for"),
            duration,
            opt(preceded(
                tuple((space1, tag_no_case("saying"), space1)),
                name_text,
            )),
        )),
        |(_, _, duration, prompt)| Statement::Wait { duration, prompt },
    )(input)
}

fn duration(input: &str) -> IResult<&str, Duration> {
    map_res(separated_list1(space1, duration_component), combine_components)(input)
}

/// A number with its unit, e.g. `30s`.
fn duration_component(input: &str) -> IResult<&str, (u64, char)> {
    pair(
        map_res(digit1, |digits: &str| digits.parse::<u64>()),
        map(one_of("hmsHMS"), |unit: char| unit.to_ascii_lowercase()),
    )(input)
}

fn combine_components(components: Vec<(u64, char)>) -> Result<Duration, &'static str> {
    let mut last_rank: Option<u8> = None;
    let mut total: u64 = 0;

    for (value, unit) in components {
        let (rank, scale) = match unit {
            'h' => (0, 3600),
            'm' => (1, 60),
            _ => (2, 1),
        };

        if last_rank.is_some_and(|last| rank <= last) {
            return Err("duration units must appear at most once, in h m s order");
        }
        last_rank = Some(rank);

        total = value
            .checked_mul(scale)
            .and_then(|secs| total.checked_add(secs))
            .ok_or("duration is too long")?;
    }

    Ok(Duration::from_secs(total))
}
