//! # Pipeline Commands
//!
//! A [`Pipeline`] is an ordered list of [`Command`]s run against a [`QueryBuilder`] before the
//! repository executes it. The standard pipeline is Filter → Load Inclusions → Sort; the item
//! pipeline only loads inclusions. The first failing command halts the run, so no later command
//! is applied to a query that has already been rejected.
//!
//! Resolution of what a command applies is kept in pure functions
//! ([`resolve_filter_values`], [`resolve_inclusions`], [`resolve_sort`]) so the default policies
//! can be checked without a database.

use sea_orm::EntityTrait;

use crate::descriptor::ResourceDescriptor;
use crate::errors::ApiError;
use crate::filtering::{FilterValues, SortDirective};
use crate::query::QueryBuilder;
use crate::request::ResourceRequest;

/// Everything a command may read while it runs
pub struct PipelineContext<'a, E: EntityTrait> {
    pub descriptor: &'a ResourceDescriptor<E>,
    pub request: &'a ResourceRequest,
}

impl<'a, E: EntityTrait> PipelineContext<'a, E> {
    #[must_use]
    pub fn new(descriptor: &'a ResourceDescriptor<E>, request: &'a ResourceRequest) -> Self {
        Self { descriptor, request }
    }
}

pub trait Command<E: EntityTrait>: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns the `ApiError` raised by a handler; the pipeline stops there.
    fn apply(&self, ctx: &PipelineContext<'_, E>, query: &mut QueryBuilder<E>) -> Result<(), ApiError>;
}

/// Invokes the handler of every filter present in the resolved value set
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCommand;

impl<E: EntityTrait> Command<E> for FilterCommand {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn apply(&self, ctx: &PipelineContext<'_, E>, query: &mut QueryBuilder<E>) -> Result<(), ApiError> {
        let values = resolve_filter_values(ctx.descriptor, ctx.request);
        for (name, filter) in ctx.descriptor.filters().iter() {
            if let Some(value) = values.get(name) {
                tracing::debug!(resource = ctx.descriptor.name(), filter = name, "Applying filter");
                filter.apply(query, value, &values)?;
            }
        }
        Ok(())
    }
}

/// Translates the resolved inclusion names into eager-load paths
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeCommand;

impl<E: EntityTrait> Command<E> for IncludeCommand {
    fn name(&self) -> &'static str {
        "include"
    }

    fn apply(&self, ctx: &PipelineContext<'_, E>, query: &mut QueryBuilder<E>) -> Result<(), ApiError> {
        for name in resolve_inclusions(ctx.descriptor, ctx.request) {
            match ctx.descriptor.inclusion_paths(&name) {
                Some(paths) => {
                    for path in paths {
                        query.with(path);
                    }
                }
                None => {
                    tracing::debug!(resource = ctx.descriptor.name(), inclusion = %name, "Skipping unknown inclusion");
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SortCommand;

impl<E: EntityTrait> Command<E> for SortCommand {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn apply(&self, ctx: &PipelineContext<'_, E>, query: &mut QueryBuilder<E>) -> Result<(), ApiError> {
        let Some(sort) = resolve_sort(ctx.descriptor, ctx.request) else {
            return Ok(());
        };
        let sorter = ctx.descriptor.sorters().get(&sort.column).ok_or_else(|| {
            ApiError::configuration(format!(
                "resource `{}` has no sorter for `{}`",
                ctx.descriptor.name(),
                sort.column
            ))
        })?;
        tracing::debug!(
            resource = ctx.descriptor.name(),
            column = %sort.column,
            direction = %sort.direction,
            "Applying sort"
        );
        sorter.apply(query, &sort.column, sort.direction)
    }
}

pub struct Pipeline<E: EntityTrait> {
    commands: Vec<Box<dyn Command<E>>>,
}

impl<E: EntityTrait> Pipeline<E> {
    #[must_use]
    pub fn new() -> Self {
        Self { commands: Vec::new() }
    }

    /// Filter → Load Inclusions → Sort
    #[must_use]
    pub fn standard() -> Self {
        Self::new().then(FilterCommand).then(IncludeCommand).then(SortCommand)
    }

    /// Load Inclusions only
    #[must_use]
    pub fn item() -> Self {
        Self::new().then(IncludeCommand)
    }

    #[must_use]
    pub fn then(mut self, command: impl Command<E> + 'static) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|command| command.name())
    }

    /// Run every command in order.
    ///
    /// # Errors
    ///
    /// Returns the first command failure; later commands are not applied.
    pub fn run(&self, ctx: &PipelineContext<'_, E>, query: &mut QueryBuilder<E>) -> Result<(), ApiError> {
        for command in &self.commands {
            tracing::trace!(resource = ctx.descriptor.name(), command = command.name(), "Running command");
            command.apply(ctx, query)?;
        }
        Ok(())
    }
}

impl<E: EntityTrait> Default for Pipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// User-supplied values for declared filters, or the defaults when the user supplied none
#[must_use]
pub fn resolve_filter_values<E: EntityTrait>(
    descriptor: &ResourceDescriptor<E>,
    request: &ResourceRequest,
) -> FilterValues {
    let supplied = request.filter_values(descriptor.filters().names());
    if supplied.is_empty() {
        descriptor.default_filters().clone()
    } else {
        supplied
    }
}

/// Global inclusions ∪ (requested inclusions, or the defaults when none were requested),
/// deduplicated with globals first
#[must_use]
pub fn resolve_inclusions<E: EntityTrait>(
    descriptor: &ResourceDescriptor<E>,
    request: &ResourceRequest,
) -> Vec<String> {
    let chosen = if request.inclusions().is_empty() {
        descriptor.default_inclusions()
    } else {
        request.inclusions()
    };

    let mut resolved = descriptor.global_inclusions().to_vec();
    for name in chosen {
        if !resolved.contains(name) {
            resolved.push(name.clone());
        }
    }
    resolved
}

/// The requested sort when a sorter is declared for it, otherwise the default sort
#[must_use]
pub fn resolve_sort<E: EntityTrait>(
    descriptor: &ResourceDescriptor<E>,
    request: &ResourceRequest,
) -> Option<SortDirective> {
    if let Some(sort) = request.sort() {
        if descriptor.sorters().contains(&sort.column) {
            return Some(sort.clone());
        }
        tracing::debug!(
            resource = descriptor.name(),
            column = %sort.column,
            "Ignoring sort on undeclared column"
        );
    }
    descriptor.default_sort_directive().cloned()
}
