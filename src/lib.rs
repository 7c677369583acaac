/*!
# Registro de Ocorrências

A browser-based data-entry form for logging power-plant ("UFV") equipment
incident reports ("ocorrências") into a spreadsheet-backed log.

## Overview

The user picks a plant, an equipment family, a substation area (SE) and an
equipment instance from cascading dropdowns populated from a published
reference spreadsheet, fills in free-text description fields plus the list of
protection relays that tripped, and saves the record, which is appended as one
12-column row to the "Ocorrências" worksheet. Previously saved records can be
listed back, most recent first.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- **Technologies**: a single static HTML page with vanilla JavaScript
- The page holds no state: after every interaction it posts the event and
  re-renders itself from the view model the server returns

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Reference Loader - fetches and parses the published equipment sheet
  - Reference Cache - application-scoped cache with TTL and manual refresh
  - Cascading Selector - option computation and downstream resets
  - Form State - all field values, driven by pure event handlers
  - Validation - temporal ordering and required-field gates
  - Log Store - append/read seam over the remote incident worksheet

## Modules

- **cascade**: selection hierarchy and cascading option computation
- **form**: form state, events and the `(state, event) -> state` transition
- **validation**: submission gates and their user-facing messages
- **record**: protection catalog, record formatting, the 12-column row
- **reference**: reference-sheet fetching, CSV parsing and caching
- **store**: the `LogStore` trait plus the gateway and in-memory backends
- **config**: environment-driven runtime configuration
- **error**: the application error taxonomy
- **app**: routing, handlers and the server loop

## REST API Endpoints

- `GET /api/form` - current view model (form state + selector options)
- `POST /api/event` - apply one form interaction
- `POST /api/gravar` - validate and append the record
- `POST /api/limpar` - reset the form to its defaults
- `GET /api/ocorrencias` - previously saved records, most recent first
- `POST /api/reference/refresh` - drop the cached reference table
*/

pub mod app;
pub mod cascade;
pub mod config;
pub mod error;
pub mod form;
pub mod record;
pub mod reference;
pub mod store;
pub mod validation;
