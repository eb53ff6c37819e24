//! Report generation for quizforge: printable HTML for graded attempts and
//! analytics dashboards.

pub mod html;
