use std::{
    ffi::OsStr,
    ops::{Deref, DerefMut},
};

use colored::Colorize;

/// `std::process::Command` that can render itself for logs
pub struct Command {
    inner: std::process::Command,
}

impl Deref for Command {
    type Target = std::process::Command;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Command {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Command {
    pub fn new<S>(program: S) -> Command
    where
        S: AsRef<OsStr>,
    {
        Self {
            inner: std::process::Command::new(program),
        }
    }

    pub fn cmd_line(&self) -> String {
        let mut cmd_str = self.get_program().to_string_lossy().to_string();

        for arg in self.get_args() {
            cmd_str += " ";
            cmd_str += arg.to_string_lossy().as_ref();
        }

        cmd_str
    }

    pub fn print_cmd(&self) {
        eprintln!("{}", self.cmd_line().purple().bold());
    }

    pub fn arg<S>(&mut self, arg: S) -> &mut Command
    where
        S: AsRef<OsStr>,
    {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        for arg in args {
            self.arg(arg);
        }
        self
    }
}
