mod admission_limits;
mod end_to_end;
mod executor_isolation;
mod planner_retries;
