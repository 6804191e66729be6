//! Navigate command
//!
//! Usage: tabula navigate '<LOCATION>'
//!
//! Feeds the location through the navigation channel with a records viewer
//! attached, as a browser view would, and prints what the viewer ends up
//! showing.

use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabula_core::{NavigationEvent, NavigationState, Record, StateChannel};
use tabula_engine::{RecordLink, RecordsViewer, SaveNotifier};

use super::{print_json, CommandResult, Context};

#[derive(Debug, Args)]
pub struct NavigateArgs {
    /// Location tail such as '#table/members' or '?id=m1#record/members'
    pub location: String,
}

#[derive(Debug, Serialize)]
struct NavigateOutput {
    state: NavigationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    links: Vec<RecordLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<Record>,
}

pub async fn execute(ctx: &Context, args: NavigateArgs) -> CommandResult {
    let navigation = Arc::new(StateChannel::new());
    let viewer = RecordsViewer::new(
        ctx.engine.clone(),
        navigation.clone(),
        Arc::new(SaveNotifier::new()),
    );

    let state = navigation.navigate(&NavigationEvent::from_location(&args.location));
    viewer.refresh().await?;

    let record = match (state.is_record_view(), state.table_name(), state.param("id")) {
        (true, Some(table), Some(id)) => ctx.engine.get(table, id).await?,
        _ => None,
    };

    print_json(&NavigateOutput {
        table: viewer.selected_table(),
        links: viewer.links(),
        record,
        state,
    })
}
