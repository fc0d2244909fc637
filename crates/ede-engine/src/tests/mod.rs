mod cancellation;
