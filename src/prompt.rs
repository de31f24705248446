//! Operator interaction
//!
//! The pipeline asks questions at three points: an unexpected branch, a
//! protected target and an uninitialized remote. It also needs a project and
//! a target when none were given on the command line. All of that goes
//! through [`Prompt`], so runs can be scripted.

use dialoguer::{Confirm, Select};
use std::sync::Mutex;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Project, Target};

/// Yes/no questions and single choice menus
pub trait Prompt: Send + Sync {
    /// Ask a yes/no question. Anything but an explicit yes is `false`.
    fn confirm(&self, message: &str) -> Result<bool>;

    /// Pick one of `items`, returning its index
    fn select(&self, message: &str, items: &[String]) -> Result<usize>;
}

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()?)
    }

    fn select(&self, message: &str, items: &[String]) -> Result<usize> {
        if items.is_empty() {
            return Err(Error::PromptFailed {
                reason: format!("nothing to choose for '{}'", message),
            });
        }
        Ok(Select::new()
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact()?)
    }
}

/// Answers every question the same way; selections pick the first item.
/// Questions are recorded.
#[derive(Debug, Default)]
pub struct FixedPrompt {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl FixedPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }

    fn record(&self, message: &str) {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
    }
}

impl Prompt for FixedPrompt {
    fn confirm(&self, message: &str) -> Result<bool> {
        self.record(message);
        Ok(self.answer)
    }

    fn select(&self, message: &str, items: &[String]) -> Result<usize> {
        self.record(message);
        if items.is_empty() {
            return Err(Error::PromptFailed {
                reason: format!("nothing to choose for '{}'", message),
            });
        }
        Ok(0)
    }
}

/// Resolve the project to deploy: the requested id, the only project, or a menu choice
pub fn choose_project<'a>(
    config: &'a Config,
    requested: Option<&str>,
    prompt: &dyn Prompt,
) -> Result<(String, &'a Project)> {
    let id = match requested {
        Some(id) => id.to_string(),
        None => choose_id(config.project_ids(), "Which project to deploy?", prompt)?,
    };
    let project = config.project(&id)?;
    Ok((id, project))
}

/// Resolve the target to deploy to, like [`choose_project`]
pub fn choose_target<'a>(
    project_id: &str,
    project: &'a Project,
    requested: Option<&str>,
    prompt: &dyn Prompt,
) -> Result<(String, &'a Target)> {
    let id = match requested {
        Some(id) => id.to_string(),
        None => choose_id(project.target_ids(), "Which target to deploy?", prompt)?,
    };
    let target = project.target(&id).ok_or_else(|| Error::TargetNotFound {
        project_id: project_id.to_string(),
        target_id: id.clone(),
    })?;
    Ok((id, target))
}

fn choose_id(ids: Vec<String>, message: &str, prompt: &dyn Prompt) -> Result<String> {
    if let [only] = ids.as_slice() {
        return Ok(only.clone());
    }
    let index = prompt.select(message, &ids)?;
    ids.get(index).cloned().ok_or_else(|| Error::PromptFailed {
        reason: format!("selection {} out of range", index),
    })
}
