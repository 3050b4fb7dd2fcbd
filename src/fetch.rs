//! Runs dataset opens and range fetches on worker threads and posts results back as app events.

use crate::buffer::{FetchRequest, FetchResponse, FetchTicket};
use crate::dataset::{open_dataset, DatasetHandle};
use crate::error::ViewError;
use crate::source::{input_source, remote_size, InputSource};
use crate::{AppEvent, OpenOptions};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

/// Fetch `request` from the dataset's source off the UI thread.
///
/// The response is posted as [`AppEvent::RowsFetched`]. If the receiver is gone (app exiting)
/// the result is dropped. If the worker cannot start, a failed response is posted instead so
/// the ticket still completes.
pub fn spawn_fetch(dataset: &DatasetHandle, request: FetchRequest, events: Sender<AppEvent>) {
    let source = Arc::clone(dataset.source());
    let columns = Arc::clone(dataset.column_names());
    let ticket = request.ticket;
    let failed = events.clone();
    let spawned = thread::Builder::new()
        .name(format!("fetch-{}", ticket.id))
        .spawn(move || {
            let result = source
                .fetch_range(&columns, ticket.buf_start, ticket.buf_end)
                .map(Arc::new);
            let _ = events.send(AppEvent::RowsFetched(FetchResponse { ticket, result }));
        });
    if let Err(e) = spawned {
        log::error!("could not start fetch thread: {}", e);
        let _ = failed.send(spawn_failed(ticket, &e));
    }
}

/// Failed response for a fetch whose worker never started.
fn spawn_failed(ticket: FetchTicket, error: &std::io::Error) -> AppEvent {
    AppEvent::RowsFetched(FetchResponse {
        ticket,
        result: Err(ViewError::fetch_failed(
            ticket.buf_start,
            ticket.buf_end,
            format!("could not start fetch thread: {}", error),
        )),
    })
}

/// Open `url` off the UI thread, reporting progress and then [`AppEvent::DatasetOpened`].
pub fn spawn_open(url: String, options: OpenOptions, events: Sender<AppEvent>) {
    let crash = events.clone();
    let spawned = thread::Builder::new()
        .name("open".into())
        .spawn(move || {
            if let InputSource::Http(_) = input_source(&url) {
                if let Some(size) = remote_size(&url) {
                    let _ = events.send(AppEvent::LoadingSize(size));
                }
            }
            let _ = events.send(AppEvent::LoadingPhase("Reading metadata".into(), 40));
            let result = open_dataset(&url, &options);
            let _ = events.send(AppEvent::DatasetOpened(result));
        });
    if let Err(e) = spawned {
        log::error!("could not start open thread: {}", e);
        let _ = crash.send(AppEvent::Crash(format!("Could not start loader: {}", e)));
    }
}
