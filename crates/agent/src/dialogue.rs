use anyhow::Result;
use async_trait::async_trait;

use carlot_core::domain::filters::{merge_filters, FilterMap};
use carlot_core::domain::vehicle::Vehicle;

use crate::analyzer::EntryAnalyzer;
use crate::llm::LlmClient;

/// Phrases that end the conversation, compared case-insensitively after
/// trimming.
pub const EXIT_PHRASES: &[&str] = &["exit", "quit", "bye"];

/// Records shown before the remainder collapses into a count.
const PREVIEW_LIMIT: usize = 5;

/// Line-based user channel. `read_line` returns `None` on end of input,
/// which ends the conversation like an exit phrase.
#[async_trait]
pub trait Console: Send {
    async fn read_line(&mut self) -> Result<Option<String>>;
    async fn say(&mut self, line: &str) -> Result<()>;
}

/// The query collaborator: executes a completed filter mapping against
/// inventory.
#[async_trait]
pub trait Inventory: Send + Sync {
    async fn search(&self, filters: &FilterMap) -> Result<Vec<Vehicle>>;
}

/// Turn-by-turn filter accumulation until the analyzer signals readiness,
/// then one inventory query and a reset.
///
/// Single-owner state: the loop holds the filter mapping and is the only
/// thing that mutates it. There is never more than one outstanding
/// operation per turn.
pub struct DialogueLoop<L, I, C> {
    analyzer: EntryAnalyzer<L>,
    inventory: I,
    console: C,
}

impl<L, I, C> DialogueLoop<L, I, C>
where
    L: LlmClient,
    I: Inventory,
    C: Console,
{
    pub fn new(analyzer: EntryAnalyzer<L>, inventory: I, console: C) -> Self {
        Self { analyzer, inventory, console }
    }

    pub async fn run(mut self) -> Result<()> {
        self.console.say("Hello! I'm your virtual assistant for vehicle search.").await?;
        self.console
            .say("How can I help you today? Are you looking for a specific car?")
            .await?;

        let mut filters = FilterMap::new();

        loop {
            let Some(input) = self.console.read_line().await? else {
                break;
            };
            let input = input.trim().to_string();

            if EXIT_PHRASES.iter().any(|phrase| input.eq_ignore_ascii_case(phrase)) {
                self.console.say("It was a pleasure to help! See you next time.").await?;
                break;
            }

            let outcome = self.analyzer.analyze(&input, &filters).await;
            merge_filters(&mut filters, outcome.new_filters);

            if !outcome.need_more_info && !filters.is_empty() {
                self.search_phase(&mut filters).await?;
            } else if outcome.need_more_info {
                if let Some(question) = outcome.next_question {
                    self.console.say(&question).await?;
                }
                // No question to relay: stay quiet and wait for more input.
            }
        }

        Ok(())
    }

    async fn search_phase(&mut self, filters: &mut FilterMap) -> Result<()> {
        self.console.say("Great! I'll look for cars with these criteria:").await?;
        for (key, value) in filters.iter() {
            self.console.say(&format!(" - {key}: {value}")).await?;
        }

        match self.inventory.search(filters).await {
            Ok(matches) if !matches.is_empty() => {
                self.console
                    .say(&format!("I found {} vehicles matching your search:", matches.len()))
                    .await?;

                for (position, vehicle) in matches.iter().take(PREVIEW_LIMIT).enumerate() {
                    self.console
                        .say(&format!("{}. {}", position + 1, vehicle.headline()))
                        .await?;
                    self.console.say(&format!("   {}", vehicle.price_line())).await?;
                }

                if matches.len() > PREVIEW_LIMIT {
                    self.console
                        .say(&format!("... and {} more results.", matches.len() - PREVIEW_LIMIT))
                        .await?;
                }
            }
            Ok(_) => {
                self.console
                    .say("I couldn't find vehicles with those criteria. Want to try different filters?")
                    .await?;
            }
            Err(error) => {
                tracing::warn!(error = %error, "inventory query failed");
                self.console
                    .say("I couldn't reach the inventory right now. Please try again in a moment.")
                    .await?;
            }
        }

        self.console.say("Start a new search, or type exit to finish.").await?;
        // Pre-search state for the next cycle, regardless of result count.
        filters.clear();
        Ok(())
    }
}
