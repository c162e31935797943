/*!
# Shift Report

A small web application for entering and reviewing daily production metrics
that live in a shared online spreadsheet.

## Overview

Supervisors sign in with their work email, which is checked against a roster
worksheet. Once verified they can enter the per-unit numbers of a shift into
the current week's worksheet, and look up the totals and weekly averages of
any day and shift. The spreadsheet itself stays the source of truth: totals
and averages are formulas in the sheet, and this service only reads and
writes cells.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, a little JavaScript
- Pages are handlebars templates compiled into the binary
- The report page asks `/api/report` for JSON and fills the table in place

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Roster lookup - Maps an email to a person's full name
  - Week resolution - Picks the latest week worksheet from tab titles
  - Report reader - Fetches a day/shift band with one batched read
  - Weekly view - Band totals and averages of a week for the dashboard
  - Submission writer - Fills empty cells of a day column and logs the entry
  - Session layer - Signed cookie with a sliding inactivity window

### Data Layer
- Google Sheets API v4 behind the [`store::SheetStore`] trait
- An in-memory [`store::MemoryStore`] for tests and local runs
- OAuth refresh-token file for the API credentials

## Worksheet Layout

Each week is a worksheet titled `MM-DD-YYYY_MM-DD-YYYY`. Columns D through H
hold Monday to Friday and column I the weekly average. Rows 6-14 are the
first shift, 20-28 the second shift and 34-42 both shifts combined.

## Modules

- **config**: Environment-driven settings
- **error**: Errors raised by the spreadsheet store
- **range**: A1 cell and range notation
- **store**: Spreadsheet access trait and in-memory store
- **google_auth**: OAuth token file and refresh
- **sheets**: Google Sheets REST client
- **roster**: Email verification
- **week**: Week worksheet titles
- **report**: Report queries and results
- **submission**: Metric submission and audit log
- **session**: Cookie session and route guards
- **pages**: Page templates
- **app**: Routing and handlers
*/

pub mod app;
pub mod config;
pub mod error;
pub mod google_auth;
pub mod pages;
pub mod range;
pub mod report;
pub mod roster;
pub mod session;
pub mod sheets;
pub mod store;
pub mod submission;
pub mod week;

pub use app::{AppState, router, run};
pub use config::AppConfig;
pub use error::StoreError;
pub use store::{MemoryStore, SheetStore};
