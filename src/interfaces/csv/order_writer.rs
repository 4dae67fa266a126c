use crate::domain::order::Order;
use crate::error::Result;
use crate::interfaces::csv::order_reader::OrderRecord;
use std::io::Write;

/// Writes orders as CSV, in the same shape [`super::order_reader::OrderReader`] accepts.
pub struct OrderWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OrderWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders<'a>(&mut self, orders: impl IntoIterator<Item = &'a Order>) -> Result<()> {
        for order in orders {
            self.writer.serialize(OrderRecord::from(order))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
