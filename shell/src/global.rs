use crate::job;
use crate::signals;

pub struct State {
	pub job_table: job::JobTable,
	pub dispositions: signals::Dispositions,
	/// Set by the `exit` builtin; the read-execute loop stops once it is `Some`.
	pub exit_requested: Option<i32>,
}

impl State {
	pub fn new(dispositions: signals::Dispositions) -> State {
		State { job_table: job::JobTable::new(), dispositions, exit_requested: None }
	}
}
